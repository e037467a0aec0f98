//! region: registry and allocator of virtual regions over the physical memory.
//!
//! Submodules:
//! - core.rs: RegionManager: init/format, span addressing, region listing.
//! - alloc.rs: register (idempotent) and grow/ensure_capacity.
//! - io.rs: bounds-checked read/write inside a region.
//!
//! Addressing is sparse: region `id` owns pages
//! `[HEADER_PAGES + id * span_pages, HEADER_PAGES + (id + 1) * span_pages)`.
//! Growth only extends physical backing inside that fixed span, so no region is ever
//! moved and two regions can never overlap.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::RESERVED_REGION_ID;
use crate::error::VaultError;

pub mod alloc;
pub mod core;
pub mod io;

pub use self::core::RegionManager;

/// Small integer naming one region. Stable across upgrades; 255 is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RegionId(u8);

impl RegionId {
    /// Panics on the reserved id 255; usable in `const` items.
    pub const fn new(id: u8) -> Self {
        assert!(id != RESERVED_REGION_ID, "region id 255 is reserved");
        Self(id)
    }

    pub fn try_new(id: u8) -> Result<Self, VaultError> {
        if id == RESERVED_REGION_ID {
            return Err(VaultError::InvalidRegionId(id));
        }
        Ok(Self(id))
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for RegionId {
    type Error = VaultError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        RegionId::try_new(v)
    }
}

impl From<RegionId> for u8 {
    fn from(id: RegionId) -> u8 {
        id.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of one region's placement and sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VirtualRegion {
    pub id: RegionId,
    pub base_page: u64,
    pub page_count: u64,
    /// Length of the frame payload stored in the region (0 if none).
    pub logical_length: u64,
}

impl VirtualRegion {
    #[inline]
    pub fn capacity_bytes(&self) -> u64 {
        self.page_count * crate::consts::PAGE_SIZE
    }
}
