//! snapshot/transfer: the five remote snapshot operations.
//!
//! Download flow: create_snapshot, then download_snapshot in chunks.
//! Upload flow:   clear_snapshot, append_snapshot per chunk, then load_snapshot.
//!
//! Only the owner's current schema is accepted on load; there is no migration here.
//! A failed load leaves the owner and the cursor as they were.

use log::{debug, info, warn};

use crate::error::{Result, VaultError};
use crate::metrics::{
    record_snapshot_append, record_snapshot_created, record_snapshot_download,
    record_snapshot_load,
};
use crate::region::RegionId;
use crate::vault::Vault;

use super::{append_frame, clear_frame, read_frame, read_payload, write_frame};

impl Vault {
    /// Encode the owner's current value into its region. Returns the payload length.
    pub fn create_snapshot(&mut self, id: RegionId) -> Result<u64> {
        self.enter_running()?;
        let payload = self.encode_owner(id)?;
        self.cursors.remove(&id);
        let len = write_frame(&mut self.regions, id, &payload)?;
        record_snapshot_created();
        info!("snapshot: created region {} ({} B)", id, len);
        Ok(len)
    }

    /// Read `[offset, offset + length)` of the stored snapshot, clamped to its length.
    pub fn download_snapshot(&self, id: RegionId, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.check_live()?;
        self.owner(id)?;
        let chunk = read_payload(&self.regions, id, offset, length)?;
        record_snapshot_download(chunk.len());
        Ok(chunk)
    }

    /// Empty the stored snapshot and open an upload cursor at 0.
    pub fn clear_snapshot(&mut self, id: RegionId) -> Result<()> {
        self.enter_running()?;
        self.owner(id)?;
        clear_frame(&mut self.regions, id)?;
        self.cursors.insert(id, 0);
        debug!("snapshot: cleared region {}", id);
        Ok(())
    }

    pub fn append_snapshot(&mut self, id: RegionId, bytes: &[u8]) -> Result<()> {
        self.enter_running()?;
        self.owner(id)?;
        let at = *self.cursors.get(&id).ok_or(VaultError::Sequence {
            id,
            reason: "append without a preceding clear",
        })?;
        let end = append_frame(&mut self.regions, id, at, bytes)?;
        self.cursors.insert(id, end);
        record_snapshot_append(bytes.len());
        debug!("snapshot: region {} appended {} B, length {}", id, bytes.len(), end);
        Ok(())
    }

    /// Decode the uploaded bytes and replace the owner's value.
    pub fn load_snapshot(&mut self, id: RegionId) -> Result<()> {
        self.enter_running()?;
        let owner = self.owner(id)?;
        if !self.cursors.contains_key(&id) {
            return Err(VaultError::Sequence {
                id,
                reason: "load without a preceding clear",
            });
        }
        let payload = read_frame(&self.regions, id)?;
        if let Err(e) = owner.decode_replace(&payload) {
            record_snapshot_load(false);
            warn!("snapshot: load into region {} rejected: {}", id, e);
            return Err(VaultError::Deserialization {
                id,
                reason: e.to_string(),
            });
        }
        self.cursors.remove(&id);
        record_snapshot_load(true);
        info!("snapshot: loaded region {} ({} B)", id, payload.len());
        Ok(())
    }

    /// Payload offset of the next append, if an upload is open.
    pub fn upload_cursor(&self, id: RegionId) -> Option<u64> {
        self.cursors.get(&id).copied()
    }
}
