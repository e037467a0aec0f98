//! region/io: bounds-checked byte access inside a region.
//!
//! Every access is validated against `page_count * PAGE_SIZE` of the region before the
//! physical memory is touched; `offset + len` overflow is treated as out of bounds.

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{FRAME_PREFIX_SIZE, PAGE_SIZE};
use crate::error::{Result, VaultError};

use super::core::RegionManager;
use super::RegionId;

impl RegionManager {
    /// Validate `[offset, offset + len)` and return the absolute byte address.
    fn locate(&self, id: RegionId, offset: u64, len: u64) -> Result<u64> {
        let capacity = self.slot(id)?.page_count * PAGE_SIZE;
        match offset.checked_add(len) {
            Some(end) if end <= capacity => Ok(self.base_page(id) * PAGE_SIZE + offset),
            _ => Err(VaultError::OutOfBounds {
                id,
                offset,
                len,
                capacity,
            }),
        }
    }

    pub fn read_into(&self, id: RegionId, offset: u64, dst: &mut [u8]) -> Result<()> {
        let abs = self.locate(id, offset, dst.len() as u64)?;
        self.mem.read(abs, dst)?;
        Ok(())
    }

    pub fn read(&self, id: RegionId, offset: u64, len: u64) -> Result<Vec<u8>> {
        // bounds first: never allocate for a request that cannot be served
        self.locate(id, offset, len)?;
        let mut buf = vec![0u8; len as usize];
        self.read_into(id, offset, &mut buf)?;
        Ok(buf)
    }

    pub fn write(&mut self, id: RegionId, offset: u64, src: &[u8]) -> Result<()> {
        let abs = self.locate(id, offset, src.len() as u64)?;
        self.mem.write(abs, src)?;
        Ok(())
    }

    /// Raw frame length prefix stored at region offset 0 (0 for an empty region).
    pub fn stored_length(&self, id: RegionId) -> Result<u64> {
        let capacity = self.capacity_bytes(id)?;
        if capacity < FRAME_PREFIX_SIZE {
            return Ok(0);
        }
        let mut b = [0u8; FRAME_PREFIX_SIZE as usize];
        self.read_into(id, 0, &mut b)?;
        Ok(LittleEndian::read_u64(&b))
    }
}
