//! memory/file: memory image backed by a single file.
//!
//! - Size is the file length in pages; a length that is not page aligned is rejected on open.
//! - grow extends the file with set_len (sparse on most filesystems); no data is copied.
//! - fsync after write/grow only when data_fsync is on (see VaultConfig).

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::config::VaultConfig;
use crate::consts::PAGE_SIZE;

use super::{check_physical, grow_target, Memory};

struct FileState {
    file: File,
    pages: u64,
}

pub struct FileMemory {
    path: PathBuf,
    state: Mutex<FileState>,
    max_pages: Option<u64>,
    data_fsync: bool,
}

impl FileMemory {
    /// Open (or create) a memory image at `path`.
    pub fn open(path: &Path, cfg: &VaultConfig) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let len = file.metadata()?.len();
        if len % PAGE_SIZE != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "memory image {} length {} is not a multiple of the page size {}",
                    path.display(),
                    len,
                    PAGE_SIZE
                ),
            ));
        }
        debug!(
            "file memory: open {} ({} page(s))",
            path.display(),
            len / PAGE_SIZE
        );
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(FileState {
                file,
                pages: len / PAGE_SIZE,
            }),
            max_pages: cfg.max_pages,
            data_fsync: cfg.data_fsync,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the image to disk regardless of data_fsync.
    pub fn sync(&self) -> io::Result<()> {
        self.state.lock().file.sync_all()
    }
}

impl Memory for FileMemory {
    fn size(&self) -> u64 {
        self.state.lock().pages
    }

    fn grow(&self, pages: u64) -> i64 {
        let mut st = self.state.lock();
        let prev = st.pages;
        let target = match grow_target(prev, pages, self.max_pages) {
            Some(t) => t,
            None => return -1,
        };
        let new_len = match target.checked_mul(PAGE_SIZE) {
            Some(l) if target <= i64::MAX as u64 => l,
            _ => return -1,
        };
        if let Err(e) = st.file.set_len(new_len) {
            warn!(
                "file memory: set_len({}) on {} failed: {}",
                new_len,
                self.path.display(),
                e
            );
            return -1;
        }
        if self.data_fsync {
            let _ = st.file.sync_all();
        }
        st.pages = target;
        prev as i64
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> io::Result<()> {
        let mut st = self.state.lock();
        check_physical(offset, dst.len(), st.pages)?;
        st.file.seek(SeekFrom::Start(offset))?;
        st.file.read_exact(dst)
    }

    fn write(&self, offset: u64, src: &[u8]) -> io::Result<()> {
        let mut st = self.state.lock();
        check_physical(offset, src.len(), st.pages)?;
        st.file.seek(SeekFrom::Start(offset))?;
        st.file.write_all(src)?;
        if self.data_fsync {
            let _ = st.file.sync_all();
        }
        Ok(())
    }
}
