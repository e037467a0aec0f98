//! vault/upgrade: the pre/post upgrade hooks.
//!
//! pre_upgrade is all-or-nothing with respect to region bytes:
//!   1) encode every bound owner (ascending id),
//!   2) grow every region to fit its frame,
//!   3) write every frame.
//! A failure in 1) or 2) returns before any frame byte is touched.
//!
//! post_upgrade decodes the current schema first and falls back to the prior schema
//! plus a migration. If neither decodes the vault is poisoned.

use log::{error, info, warn};

use crate::codec::Persist;
use crate::error::{Result, VaultError};
use crate::metrics::{record_upgrade_failure, record_upgrade_frame, record_upgrade_restore};
use crate::region::RegionId;
use crate::snapshot::{read_frame, write_frame};

use super::core::{Phase, Vault};
use super::global::Global;

impl Vault {
    /// Persist every bound owner into its region before the code is replaced.
    pub fn pre_upgrade(&mut self) -> Result<()> {
        self.check_live()?;
        self.phase = Phase::Serializing;
        let res = self.write_all_frames();
        self.phase = Phase::Running;
        match &res {
            Ok(n) => info!("pre_upgrade: wrote {} frame(s)", n),
            Err(e) => {
                record_upgrade_failure();
                error!("pre_upgrade: aborted, no frame written: {}", e);
            }
        }
        res.map(|_| ())
    }

    fn write_all_frames(&mut self) -> Result<usize> {
        let mut frames = Vec::with_capacity(self.owners.len());
        for &id in self.owners.keys() {
            frames.push((id, self.encode_owner(id)?));
        }
        for (id, payload) in &frames {
            self.regions
                .ensure_capacity(*id, crate::consts::FRAME_PREFIX_SIZE + payload.len() as u64)?;
        }
        for (id, payload) in &frames {
            write_frame(&mut self.regions, *id, payload)?;
            record_upgrade_frame(payload.len());
        }
        Ok(frames.len())
    }

    /// Restore `global` from region `id` after an upgrade and bind it.
    ///
    /// The frame is decoded as `T`; if that fails and `migrate` is given it is decoded
    /// as `Old` and passed through `migrate`. If both fail the vault is poisoned.
    pub fn post_upgrade<T, Old, F>(
        &mut self,
        id: RegionId,
        global: Global<T>,
        migrate: Option<F>,
    ) -> Result<()>
    where
        T: Persist + 'static,
        Old: Persist,
        F: FnOnce(Old) -> T,
    {
        self.check_live()?;
        self.phase = Phase::Deserializing;

        let payload = match self.regions.register(id).and_then(|_| read_frame(&self.regions, id)) {
            Ok(p) => p,
            Err(e) => return Err(self.poison(id, format!("cannot read frame: {}", e))),
        };

        let (value, migrated) = match T::decode(&payload) {
            Ok(v) => (v, false),
            Err(current) => match migrate {
                Some(f) => match Old::decode(&payload) {
                    Ok(old) => {
                        warn!(
                            "post_upgrade: region {} holds a prior schema ({}), migrating",
                            id, current
                        );
                        (f(old), true)
                    }
                    Err(prior) => {
                        let reason = format!("current: {}; prior: {}", current, prior);
                        return Err(self.poison(id, reason));
                    }
                },
                None => return Err(self.poison(id, current.to_string())),
            },
        };

        global.replace(value);
        self.owners.remove(&id);
        self.bind(id, global);
        self.cursors.remove(&id);
        self.phase = Phase::Running;
        record_upgrade_restore(migrated);
        info!(
            "post_upgrade: restored region {} ({} B{})",
            id,
            payload.len(),
            if migrated { ", migrated" } else { "" }
        );
        Ok(())
    }

    /// `post_upgrade` without a migration.
    pub fn restore_global<T: Persist + 'static>(
        &mut self,
        id: RegionId,
        global: Global<T>,
    ) -> Result<()> {
        self.post_upgrade::<T, T, fn(T) -> T>(id, global, None)
    }

    fn poison(&mut self, id: RegionId, reason: String) -> VaultError {
        self.phase = Phase::Poisoned;
        record_upgrade_failure();
        error!("post_upgrade: region {} undecodable, vault poisoned: {}", id, reason);
        VaultError::Deserialization { id, reason }
    }
}
