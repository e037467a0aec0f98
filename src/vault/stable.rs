//! vault/stable: raw region access for operators.
//!
//! Offsets are region offsets: offset 0 is the frame length prefix.

use crate::error::{Result, VaultError};
use crate::region::RegionId;

use super::core::Vault;

impl Vault {
    pub fn stable_read(&self, id: RegionId, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.check_live()?;
        self.regions.read(id, offset, len)
    }

    pub fn stable_write(&mut self, id: RegionId, offset: u64, bytes: &[u8]) -> Result<()> {
        self.enter_running()?;
        self.regions.write(id, offset, bytes)
    }

    /// Region size in pages.
    pub fn stable_size(&self, id: RegionId) -> Result<u64> {
        self.check_live()?;
        self.regions.size(id)
    }

    /// Grow by `pages`. Returns the previous page count, or -1 when growth is refused.
    pub fn stable_grow(&mut self, id: RegionId, pages: u64) -> Result<i64> {
        self.enter_running()?;
        match self.regions.grow(id, pages) {
            Ok(prev) => Ok(prev as i64),
            Err(VaultError::Capacity { .. }) => Ok(-1),
            Err(e) => Err(e),
        }
    }
}
