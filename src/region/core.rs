//! region/core: RegionManager: memory ownership, header load/format, span addressing.

use std::io;

use log::{debug, info, warn};

use crate::config::VaultConfig;
use crate::consts::{HEADER_PAGES, MAX_REGIONS, PAGE_SIZE};
use crate::error::{Result, VaultError};
use crate::memory::Memory;
use crate::meta::{read_header, write_header, MemoryHeader, RegionSlot};

use super::{RegionId, VirtualRegion};

/// Owns the physical memory and the region table.
pub struct RegionManager {
    pub(crate) mem: Box<dyn Memory>,
    pub(crate) span_pages: u64,
    pub(crate) slots: Vec<RegionSlot>,
}

impl RegionManager {
    /// Open the region table stored in `mem`, formatting a blank memory first.
    pub fn init(mem: Box<dyn Memory>, cfg: &VaultConfig) -> Result<Self> {
        match read_header(mem.as_ref())? {
            Some(h) => {
                if h.span_pages != cfg.span_pages {
                    warn!(
                        "regions: stored span_pages={} differs from configured {}; using stored",
                        h.span_pages, cfg.span_pages
                    );
                }
                validate_span(h.span_pages)?;
                let rm = Self {
                    mem,
                    span_pages: h.span_pages,
                    slots: h.slots,
                };
                rm.validate_physical()?;
                debug!(
                    "regions: loaded header, span_pages={}, registered={}",
                    rm.span_pages,
                    rm.slots.iter().filter(|s| s.registered).count()
                );
                Ok(rm)
            }
            None => {
                validate_span(cfg.span_pages)?;
                let size = mem.size();
                if size < HEADER_PAGES && mem.grow(HEADER_PAGES - size) < 0 {
                    return Err(VaultError::Io(io::Error::new(
                        io::ErrorKind::OutOfMemory,
                        "host refused the header page(s)",
                    )));
                }
                let h = MemoryHeader::new(cfg.span_pages);
                write_header(mem.as_ref(), &h)?;
                info!("regions: formatted blank memory, span_pages={}", cfg.span_pages);
                Ok(Self {
                    mem,
                    span_pages: h.span_pages,
                    slots: h.slots,
                })
            }
        }
    }

    /// Every registered region must be physically backed.
    fn validate_physical(&self) -> Result<()> {
        let phys = self.mem.size();
        for (i, slot) in self.slots.iter().enumerate() {
            if !slot.registered || slot.page_count == 0 {
                continue;
            }
            let end = self.base_page_of(i) + slot.page_count;
            if end > phys {
                return Err(VaultError::CorruptHeader(format!(
                    "region {} ends at page {} but memory has {} page(s)",
                    i, end, phys
                )));
            }
        }
        Ok(())
    }

    #[inline]
    fn base_page_of(&self, idx: usize) -> u64 {
        HEADER_PAGES + idx as u64 * self.span_pages
    }

    /// First physical page of the region's span.
    #[inline]
    pub fn base_page(&self, id: RegionId) -> u64 {
        self.base_page_of(id.index())
    }

    #[inline]
    pub fn span_pages(&self) -> u64 {
        self.span_pages
    }

    /// Physical pages currently backing the whole memory.
    #[inline]
    pub fn physical_pages(&self) -> u64 {
        self.mem.size()
    }

    #[inline]
    pub fn is_registered(&self, id: RegionId) -> bool {
        self.slots[id.index()].registered
    }

    pub(crate) fn slot(&self, id: RegionId) -> Result<&RegionSlot> {
        let s = &self.slots[id.index()];
        if !s.registered {
            return Err(VaultError::UnknownRegion(id));
        }
        Ok(s)
    }

    /// Current size of the region in pages.
    pub fn size(&self, id: RegionId) -> Result<u64> {
        Ok(self.slot(id)?.page_count)
    }

    /// Current byte capacity of the region.
    pub fn capacity_bytes(&self, id: RegionId) -> Result<u64> {
        Ok(self.slot(id)?.page_count * PAGE_SIZE)
    }

    /// Placement and sizes of one registered region.
    pub fn region(&self, id: RegionId) -> Result<VirtualRegion> {
        let slot = *self.slot(id)?;
        let cap = slot.page_count * PAGE_SIZE;
        let logical_length = self.stored_length(id)?.min(cap.saturating_sub(8));
        Ok(VirtualRegion {
            id,
            base_page: self.base_page(id),
            page_count: slot.page_count,
            logical_length,
        })
    }

    /// All registered regions, ascending id.
    pub fn regions(&self) -> Result<Vec<VirtualRegion>> {
        let mut out = Vec::new();
        for i in 0..MAX_REGIONS {
            if self.slots[i].registered {
                out.push(self.region(RegionId::new(i as u8))?);
            }
        }
        Ok(out)
    }
}

fn validate_span(span_pages: u64) -> Result<()> {
    let max_span = (u64::MAX / PAGE_SIZE - HEADER_PAGES) / MAX_REGIONS as u64;
    if span_pages == 0 || span_pages > max_span {
        return Err(VaultError::CorruptHeader(format!(
            "span_pages {} outside [1 .. {}]",
            span_pages, max_span
        )));
    }
    Ok(())
}
