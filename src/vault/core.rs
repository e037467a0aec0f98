//! vault/core: the Vault (region manager, owner bindings, lifecycle phase).
//!
//! One Vault per compute unit. Every public operation takes the vault by reference,
//! so calls are serialized by the borrow checker; owners themselves are shared
//! `Global<T>` handles the program may read from anywhere.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::codec::{CodecError, Persist};
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::memory::Memory;
use crate::region::{RegionId, RegionManager};

use super::global::Global;

/// Lifecycle of the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Opened; owners are being registered or restored.
    Init,
    Running,
    /// Inside `pre_upgrade`.
    Serializing,
    /// Inside `post_upgrade`.
    Deserializing,
    /// A post-upgrade restore failed; every further operation is rejected.
    Poisoned,
}

/// Type-erased owner bound to a region.
pub(crate) trait OwnerSlot {
    /// Encode the owner's current value.
    fn encode(&self) -> std::result::Result<Vec<u8>, CodecError>;

    /// Decode `bytes` as the owner's type and replace its value.
    /// The value is left untouched on failure.
    fn decode_replace(&self, bytes: &[u8]) -> std::result::Result<(), CodecError>;

    fn type_name(&self) -> &'static str;
}

struct Bound<T>(Global<T>);

impl<T: Persist> OwnerSlot for Bound<T> {
    fn encode(&self) -> std::result::Result<Vec<u8>, CodecError> {
        self.0.with(|v| v.encode())
    }

    fn decode_replace(&self, bytes: &[u8]) -> std::result::Result<(), CodecError> {
        let v = T::decode(bytes)?;
        self.0.replace(v);
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

pub struct Vault {
    pub(crate) regions: RegionManager,
    pub(crate) owners: BTreeMap<RegionId, Box<dyn OwnerSlot>>,
    /// Open upload cursors (payload offset of the next append).
    pub(crate) cursors: BTreeMap<RegionId, u64>,
    pub(crate) phase: Phase,
    cfg: VaultConfig,
}

impl Vault {
    /// Open a vault over `mem`, formatting it when blank.
    pub fn open<M: Memory + 'static>(mem: M, cfg: VaultConfig) -> Result<Self> {
        let regions = RegionManager::init(Box::new(mem), &cfg)?;
        info!(
            "vault: opened, {} physical page(s), span_pages={}",
            regions.physical_pages(),
            regions.span_pages()
        );
        Ok(Self {
            regions,
            owners: BTreeMap::new(),
            cursors: BTreeMap::new(),
            phase: Phase::Init,
            cfg,
        })
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn config(&self) -> &VaultConfig {
        &self.cfg
    }

    /// Read-only view of the region table.
    #[inline]
    pub fn regions(&self) -> &RegionManager {
        &self.regions
    }

    /// Whether `id` has a bound owner.
    pub fn is_bound(&self, id: RegionId) -> bool {
        self.owners.contains_key(&id)
    }

    /// Ids with a bound owner, ascending.
    pub fn bound_ids(&self) -> Vec<RegionId> {
        self.owners.keys().copied().collect()
    }

    /// Bind `global` to region `id` and register the region.
    ///
    /// Called once per id while the program initializes. The owner keeps whatever
    /// value it holds; restoring from the region is `post_upgrade`'s job.
    pub fn register_global<T: Persist + 'static>(
        &mut self,
        id: RegionId,
        global: Global<T>,
    ) -> Result<()> {
        self.check_live()?;
        if self.owners.contains_key(&id) {
            return Err(VaultError::AlreadyBound(id));
        }
        self.regions.register(id)?;
        self.bind(id, global);
        Ok(())
    }

    pub(crate) fn bind<T: Persist + 'static>(&mut self, id: RegionId, global: Global<T>) {
        let slot = Bound(global);
        debug!("vault: bound {} to region {}", slot.type_name(), id);
        self.owners.insert(id, Box::new(slot));
    }

    pub(crate) fn check_live(&self) -> Result<()> {
        if self.phase == Phase::Poisoned {
            return Err(VaultError::Poisoned);
        }
        Ok(())
    }

    /// First mutating call after initialization moves the vault to Running.
    pub(crate) fn enter_running(&mut self) -> Result<()> {
        self.check_live()?;
        if self.phase == Phase::Init {
            self.phase = Phase::Running;
        }
        Ok(())
    }

    pub(crate) fn owner(&self, id: RegionId) -> Result<&dyn OwnerSlot> {
        self.owners
            .get(&id)
            .map(|b| b.as_ref())
            .ok_or(VaultError::UnknownRegion(id))
    }

    /// Encode the owner bound to `id`.
    pub(crate) fn encode_owner(&self, id: RegionId) -> Result<Vec<u8>> {
        self.owner(id)?
            .encode()
            .map_err(|e| VaultError::Serialization {
                id,
                reason: e.to_string(),
            })
    }
}
