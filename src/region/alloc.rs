//! region/alloc: registration and growth.
//!
//! Rules:
//! - register is idempotent; the first call marks the slot registered and persists it.
//! - grow extends the region inside its pre-reserved span. The span bound and the host's
//!   physical limit are both reported as Capacity; nothing changes on failure.
//! - Physical memory only grows (to the highest region end), it is never shrunk.

use log::{debug, warn};

use crate::consts::PAGE_SIZE;
use crate::error::{Result, VaultError};
use crate::meta::write_slot;
use crate::metrics::{record_region_grow, record_region_grow_failed};

use super::core::RegionManager;
use super::{RegionId, VirtualRegion};

impl RegionManager {
    /// Register `id` (idempotent) and return its current mapping.
    pub fn register(&mut self, id: RegionId) -> Result<VirtualRegion> {
        let idx = id.index();
        if !self.slots[idx].registered {
            let mut slot = self.slots[idx];
            slot.registered = true;
            write_slot(self.mem.as_ref(), idx, &slot)?;
            self.slots[idx] = slot;
            debug!(
                "regions: registered {} at base_page={}",
                id,
                self.base_page(id)
            );
        }
        self.region(id)
    }

    /// Extend the region by `additional` pages. Returns the previous page count.
    pub fn grow(&mut self, id: RegionId, additional: u64) -> Result<u64> {
        let prev = self.slot(id)?.page_count;
        if additional == 0 {
            return Ok(prev);
        }

        let new_count = match prev.checked_add(additional) {
            Some(n) if n <= self.span_pages => n,
            _ => {
                record_region_grow_failed();
                return Err(VaultError::capacity(
                    id,
                    additional,
                    format!(
                        "span of {} page(s) exhausted ({} in use)",
                        self.span_pages, prev
                    ),
                ));
            }
        };

        let need_end = self.base_page(id) + new_count;
        let phys = self.mem.size();
        if phys < need_end && self.mem.grow(need_end - phys) < 0 {
            record_region_grow_failed();
            warn!(
                "regions: host refused growth of {} to {} page(s) (physical {} -> {})",
                id, new_count, phys, need_end
            );
            return Err(VaultError::capacity(
                id,
                additional,
                "host refused to grow physical memory",
            ));
        }

        let mut slot = self.slots[id.index()];
        slot.page_count = new_count;
        write_slot(self.mem.as_ref(), id.index(), &slot)?;
        self.slots[id.index()] = slot;

        record_region_grow(additional);
        debug!("regions: grow {} {} -> {} page(s)", id, prev, new_count);
        Ok(prev)
    }

    /// Grow so the region holds at least `bytes` bytes.
    pub fn ensure_capacity(&mut self, id: RegionId, bytes: u64) -> Result<()> {
        let have = self.slot(id)?.page_count;
        let need = bytes.div_ceil(PAGE_SIZE);
        if need > have {
            self.grow(id, need - have)?;
        }
        Ok(())
    }
}
