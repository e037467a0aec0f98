//! memory/vec: sparse in-process memory.
//!
//! Pages are materialized on first write; unwritten pages read as zeroes. This keeps
//! the sparse region layout (one large virtual span per region id) cheap in RAM.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::consts::PAGE_SIZE;

use super::{check_physical, grow_target, Memory};

#[derive(Default)]
struct SparsePages {
    pages: BTreeMap<u64, Box<[u8]>>,
    size: u64,
    max_pages: Option<u64>,
}

/// In-process memory. Clones share storage.
#[derive(Clone, Default)]
pub struct VecMemory {
    inner: Arc<RwLock<SparsePages>>,
}

impl VecMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory whose host refuses to grow beyond `max_pages` pages.
    pub fn with_max_pages(max_pages: u64) -> Self {
        let m = Self::default();
        m.inner.write().max_pages = Some(max_pages);
        m
    }

    /// Number of pages that have been materialized by writes.
    pub fn resident_pages(&self) -> usize {
        self.inner.read().pages.len()
    }
}

impl Memory for VecMemory {
    fn size(&self) -> u64 {
        self.inner.read().size
    }

    fn grow(&self, pages: u64) -> i64 {
        let mut g = self.inner.write();
        let prev = g.size;
        match grow_target(prev, pages, g.max_pages) {
            Some(target) if target <= i64::MAX as u64 => {
                g.size = target;
                debug!("vec memory: grow {} -> {} page(s)", prev, target);
                prev as i64
            }
            _ => -1,
        }
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> io::Result<()> {
        let g = self.inner.read();
        check_physical(offset, dst.len(), g.size)?;

        let mut done = 0usize;
        while done < dst.len() {
            let pos = offset + done as u64;
            let page_no = pos / PAGE_SIZE;
            let in_page = (pos % PAGE_SIZE) as usize;
            let take = (PAGE_SIZE as usize - in_page).min(dst.len() - done);
            let out = &mut dst[done..done + take];
            match g.pages.get(&page_no) {
                Some(page) => out.copy_from_slice(&page[in_page..in_page + take]),
                None => out.fill(0),
            }
            done += take;
        }
        Ok(())
    }

    fn write(&self, offset: u64, src: &[u8]) -> io::Result<()> {
        let mut g = self.inner.write();
        check_physical(offset, src.len(), g.size)?;

        let mut done = 0usize;
        while done < src.len() {
            let pos = offset + done as u64;
            let page_no = pos / PAGE_SIZE;
            let in_page = (pos % PAGE_SIZE) as usize;
            let take = (PAGE_SIZE as usize - in_page).min(src.len() - done);
            let page = g
                .pages
                .entry(page_no)
                .or_insert_with(|| vec![0u8; PAGE_SIZE as usize].into_boxed_slice());
            page[in_page..in_page + take].copy_from_slice(&src[done..done + take]);
            done += take;
        }
        Ok(())
    }
}
