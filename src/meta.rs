// src/meta.rs: StableVault memory header (page 0)
//
// Layout (LE):
// MAGIC8 = "SVLTMEM1"
// u32 version      = 1
// u32 page_size    = 65536
// u64 span_pages   (virtual pages reserved per region id)
// u64 reserved
// then MAX_REGIONS slots of 16 bytes:
//   u64 page_count
//   u32 flags      (bit0 = registered)
//   u32 reserved
//
// Policy:
// - A memory of size 0 (or with an all-zero magic) is blank and gets formatted.
// - Any other magic/version/page_size is a hard error: we never reinterpret foreign bytes.
// - Slots are rewritten individually on register/grow; the fixed part only on format.

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{
    HEADER_FIXED_SIZE, HEADER_MAGIC, HEADER_PAGES, HEADER_VERSION, MAX_REGIONS, PAGE_SIZE,
    REGION_FLAG_REGISTERED, REGION_SLOT_SIZE,
};
use crate::error::{Result, VaultError};
use crate::memory::Memory;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionSlot {
    pub page_count: u64,
    pub registered: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryHeader {
    pub version: u32,
    pub page_size: u32,
    pub span_pages: u64,
    pub slots: Vec<RegionSlot>, // len == MAX_REGIONS
}

impl MemoryHeader {
    pub fn new(span_pages: u64) -> Self {
        Self {
            version: HEADER_VERSION,
            page_size: PAGE_SIZE as u32,
            span_pages,
            slots: vec![RegionSlot::default(); MAX_REGIONS],
        }
    }
}

#[inline]
fn slot_offset(idx: usize) -> u64 {
    (HEADER_FIXED_SIZE + idx * REGION_SLOT_SIZE) as u64
}

fn encode_slot(slot: &RegionSlot) -> [u8; REGION_SLOT_SIZE] {
    let mut buf = [0u8; REGION_SLOT_SIZE];
    LittleEndian::write_u64(&mut buf[0..8], slot.page_count);
    let flags = if slot.registered { REGION_FLAG_REGISTERED } else { 0 };
    LittleEndian::write_u32(&mut buf[8..12], flags);
    buf
}

fn decode_slot(buf: &[u8]) -> RegionSlot {
    RegionSlot {
        page_count: LittleEndian::read_u64(&buf[0..8]),
        registered: LittleEndian::read_u32(&buf[8..12]) & REGION_FLAG_REGISTERED != 0,
    }
}

/// Read the header. Ok(None) means the memory is blank (never formatted).
pub fn read_header(mem: &dyn Memory) -> Result<Option<MemoryHeader>> {
    if mem.size() < HEADER_PAGES {
        return Ok(None);
    }
    let total = HEADER_FIXED_SIZE + MAX_REGIONS * REGION_SLOT_SIZE;
    let mut buf = vec![0u8; total];
    mem.read(0, &mut buf)?;

    if buf[0..8].iter().all(|b| *b == 0) {
        return Ok(None);
    }
    if &buf[0..8] != HEADER_MAGIC {
        return Err(VaultError::CorruptHeader("bad magic".to_string()));
    }
    let version = LittleEndian::read_u32(&buf[8..12]);
    if version != HEADER_VERSION {
        return Err(VaultError::CorruptHeader(format!(
            "unsupported header version {}",
            version
        )));
    }
    let page_size = LittleEndian::read_u32(&buf[12..16]);
    if page_size as u64 != PAGE_SIZE {
        return Err(VaultError::CorruptHeader(format!(
            "page_size {} != {}",
            page_size, PAGE_SIZE
        )));
    }
    let span_pages = LittleEndian::read_u64(&buf[16..24]);
    if span_pages == 0 {
        return Err(VaultError::CorruptHeader("span_pages is 0".to_string()));
    }

    let mut slots = Vec::with_capacity(MAX_REGIONS);
    for i in 0..MAX_REGIONS {
        let off = HEADER_FIXED_SIZE + i * REGION_SLOT_SIZE;
        let slot = decode_slot(&buf[off..off + REGION_SLOT_SIZE]);
        if slot.page_count > span_pages {
            return Err(VaultError::CorruptHeader(format!(
                "region {} page_count {} exceeds span {}",
                i, slot.page_count, span_pages
            )));
        }
        slots.push(slot);
    }

    Ok(Some(MemoryHeader {
        version,
        page_size,
        span_pages,
        slots,
    }))
}

/// Write the full header (fixed part + every slot). Memory must hold HEADER_PAGES.
pub fn write_header(mem: &dyn Memory, h: &MemoryHeader) -> Result<()> {
    let mut buf = vec![0u8; HEADER_FIXED_SIZE + MAX_REGIONS * REGION_SLOT_SIZE];
    buf[0..8].copy_from_slice(HEADER_MAGIC);
    LittleEndian::write_u32(&mut buf[8..12], h.version);
    LittleEndian::write_u32(&mut buf[12..16], h.page_size);
    LittleEndian::write_u64(&mut buf[16..24], h.span_pages);
    for (i, slot) in h.slots.iter().enumerate().take(MAX_REGIONS) {
        let off = HEADER_FIXED_SIZE + i * REGION_SLOT_SIZE;
        buf[off..off + REGION_SLOT_SIZE].copy_from_slice(&encode_slot(slot));
    }
    mem.write(0, &buf)?;
    Ok(())
}

/// Rewrite a single region slot.
pub fn write_slot(mem: &dyn Memory, idx: usize, slot: &RegionSlot) -> Result<()> {
    mem.write(slot_offset(idx), &encode_slot(slot))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VecMemory;

    #[test]
    fn header_roundtrip_and_blank_detection() {
        let mem = VecMemory::new();
        assert!(read_header(&mem).unwrap().is_none());
        mem.grow(HEADER_PAGES);
        assert!(read_header(&mem).unwrap().is_none());

        let mut h = MemoryHeader::new(64);
        h.slots[3] = RegionSlot {
            page_count: 7,
            registered: true,
        };
        write_header(&mem, &h).unwrap();

        write_slot(
            &mem,
            9,
            &RegionSlot {
                page_count: 0,
                registered: true,
            },
        )
        .unwrap();

        let back = read_header(&mem).unwrap().expect("formatted");
        assert_eq!(back.span_pages, 64);
        assert_eq!(back.slots[3].page_count, 7);
        assert!(back.slots[3].registered);
        assert!(back.slots[9].registered);
        assert!(!back.slots[0].registered);
    }

    #[test]
    fn foreign_bytes_are_rejected() {
        let mem = VecMemory::new();
        mem.grow(1);
        mem.write(0, b"NOTAVLT!").unwrap();
        assert!(matches!(
            read_header(&mem),
            Err(VaultError::CorruptHeader(_))
        ));
    }
}
