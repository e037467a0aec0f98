//! snapshot: region frames and the chunked transfer protocol.
//!
//! Frame layout inside a region:
//!   offset 0: [logical_length u64 LE]
//!   offset 8: payload (logical_length bytes)
//!
//! The free functions here work on a bare RegionManager and are shared by the upgrade
//! hooks, the transfer protocol (transfer.rs) and the offline operator tool.
//! A frame is always written payload first, length prefix last.

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::FRAME_PREFIX_SIZE;
use crate::error::{Result, VaultError};
use crate::region::{RegionId, RegionManager};

pub mod transfer;

/// Logical payload length of the frame, clamped to what the region can hold.
pub fn frame_len(rm: &RegionManager, id: RegionId) -> Result<u64> {
    Ok(rm.region(id)?.logical_length)
}

/// Whole frame payload.
pub fn read_frame(rm: &RegionManager, id: RegionId) -> Result<Vec<u8>> {
    let len = frame_len(rm, id)?;
    if len == 0 {
        return Ok(Vec::new());
    }
    rm.read(id, FRAME_PREFIX_SIZE, len)
}

/// `[offset, offset + len)` of the payload, clamped to the logical length.
pub fn read_payload(rm: &RegionManager, id: RegionId, offset: u64, len: u64) -> Result<Vec<u8>> {
    let total = frame_len(rm, id)?;
    if offset >= total {
        return Ok(Vec::new());
    }
    let end = offset.saturating_add(len).min(total);
    rm.read(id, FRAME_PREFIX_SIZE + offset, end - offset)
}

/// Replace the frame with `payload`, growing the region first. Returns the length.
pub fn write_frame(rm: &mut RegionManager, id: RegionId, payload: &[u8]) -> Result<u64> {
    let len = payload.len() as u64;
    rm.ensure_capacity(id, FRAME_PREFIX_SIZE + len)?;
    rm.write(id, FRAME_PREFIX_SIZE, payload)?;
    set_len(rm, id, len)?;
    Ok(len)
}

/// Set the logical length to 0. A region without pages is already empty.
pub fn clear_frame(rm: &mut RegionManager, id: RegionId) -> Result<()> {
    if rm.capacity_bytes(id)? < FRAME_PREFIX_SIZE {
        return Ok(());
    }
    set_len(rm, id, 0)
}

/// Write `bytes` at payload offset `at`, growing as needed. Returns the new length.
pub fn append_frame(rm: &mut RegionManager, id: RegionId, at: u64, bytes: &[u8]) -> Result<u64> {
    let new_len = at
        .checked_add(bytes.len() as u64)
        .ok_or(VaultError::OutOfBounds {
            id,
            offset: at,
            len: bytes.len() as u64,
            capacity: rm.capacity_bytes(id)?,
        })?;
    rm.ensure_capacity(id, FRAME_PREFIX_SIZE.saturating_add(new_len))?;
    rm.write(id, FRAME_PREFIX_SIZE + at, bytes)?;
    set_len(rm, id, new_len)?;
    Ok(new_len)
}

fn set_len(rm: &mut RegionManager, id: RegionId, len: u64) -> Result<()> {
    let mut b = [0u8; FRAME_PREFIX_SIZE as usize];
    LittleEndian::write_u64(&mut b, len);
    rm.write(id, 0, &b)
}
