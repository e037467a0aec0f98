//! Shared format constants (memory image header, region frames, snapshot payload).

// -------- Physical memory --------
/// Page size of the linear memory (64 KiB, the wasm page size).
pub const PAGE_SIZE: u64 = 64 * 1024;

// -------- Header page --------
pub const HEADER_MAGIC: &[u8; 8] = b"SVLTMEM1";
pub const HEADER_VERSION: u32 = 1;
/// Pages reserved at the start of the memory for the header + region table.
pub const HEADER_PAGES: u64 = 1;
// [magic8][version u32][page_size u32][span_pages u64][reserved u64]
pub const HEADER_FIXED_SIZE: usize = 32;
// Region table slot: [page_count u64][flags u32][reserved u32]
pub const REGION_SLOT_SIZE: usize = 16;
pub const REGION_FLAG_REGISTERED: u32 = 0x1;

// -------- Region ids --------
/// Number of usable region ids (0..=254). 255 is reserved.
pub const MAX_REGIONS: usize = 255;
pub const RESERVED_REGION_ID: u8 = 255;

/// Default virtual span reserved per region (8192 pages = 512 MiB).
pub const DEFAULT_SPAN_PAGES: u64 = 8192;

// -------- Region frame --------
// Region offset 0: [logical_length u64], payload at FRAME_PREFIX_SIZE.
pub const FRAME_PREFIX_SIZE: u64 = 8;

// -------- Snapshot payload --------
// [magic4 "SVB1"][crc32 u32][body]
pub const PAYLOAD_MAGIC: &[u8; 4] = b"SVB1";
pub const PAYLOAD_HDR_SIZE: usize = 8;

/// Default chunk for chunked transfers (1.5 MiB).
pub const DEFAULT_CHUNK_BYTES: usize = 1_572_864;
