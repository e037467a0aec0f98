//! memory: the unit's single physical linear memory.
//!
//! Submodules:
//! - vec.rs: VecMemory: sparse in-process memory; clones share the same pages,
//!             which lets tests model a process restart over the same memory.
//! - file.rs: FileMemory: memory image file, grown with set_len.
//!
//! The memory is page-granular and grow-only. Bounds are enforced here only as a
//! last line; callers go through `RegionManager`, which checks per-region bounds.

use std::io;

pub mod file;
pub mod vec;

pub use file::FileMemory;
pub use vec::VecMemory;

/// Page-granular, grow-only linear memory.
pub trait Memory {
    /// Current size in pages.
    fn size(&self) -> u64;

    /// Grow by `pages`. Returns the previous size in pages, or -1 when the host refuses.
    fn grow(&self, pages: u64) -> i64;

    /// Read `dst.len()` bytes starting at byte `offset`.
    fn read(&self, offset: u64, dst: &mut [u8]) -> io::Result<()>;

    /// Write `src` starting at byte `offset`.
    fn write(&self, offset: u64, src: &[u8]) -> io::Result<()>;
}

/// Shared physical bounds check for the backends.
pub(crate) fn check_physical(offset: u64, len: usize, size_pages: u64) -> io::Result<()> {
    let cap = size_pages.saturating_mul(crate::consts::PAGE_SIZE);
    let end = offset.checked_add(len as u64);
    match end {
        Some(end) if end <= cap => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "physical access [{}, +{}) beyond memory size {} B",
                offset, len, cap
            ),
        )),
    }
}

/// Pages needed to grow from `size` to `target` pages, honouring an optional cap.
/// Returns None when the cap would be exceeded.
pub(crate) fn grow_target(size: u64, pages: u64, max_pages: Option<u64>) -> Option<u64> {
    let target = size.checked_add(pages)?;
    match max_pages {
        Some(cap) if target > cap => None,
        _ => Some(target),
    }
}
