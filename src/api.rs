//! api: remote-callable operations as typed requests and replies.
//!
//! Each `Operation` maps onto one Vault method. A failed call is rejected as a
//! whole with a stable error code; there is no partial reply.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::VaultError;
use crate::region::RegionId;
use crate::vault::Vault;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateStateSnapshot {
        region: RegionId,
    },
    DownloadStateSnapshot {
        region: RegionId,
        offset: u64,
        length: u64,
    },
    ClearStateSnapshot {
        region: RegionId,
    },
    AppendStateSnapshot {
        region: RegionId,
        bytes: Vec<u8>,
    },
    LoadStateSnapshot {
        region: RegionId,
    },
    StableMemoryRead {
        region: RegionId,
        offset: u64,
        length: u64,
    },
    StableMemoryWrite {
        region: RegionId,
        offset: u64,
        bytes: Vec<u8>,
    },
    StableMemorySize {
        region: RegionId,
    },
    StableMemoryGrow {
        region: RegionId,
        pages: u64,
    },
}

impl Operation {
    pub fn region(&self) -> RegionId {
        match self {
            Operation::CreateStateSnapshot { region }
            | Operation::DownloadStateSnapshot { region, .. }
            | Operation::ClearStateSnapshot { region }
            | Operation::AppendStateSnapshot { region, .. }
            | Operation::LoadStateSnapshot { region }
            | Operation::StableMemoryRead { region, .. }
            | Operation::StableMemoryWrite { region, .. }
            | Operation::StableMemorySize { region }
            | Operation::StableMemoryGrow { region, .. } => *region,
        }
    }

    /// Whether the operation may change region bytes, sizes or owner values.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Operation::DownloadStateSnapshot { .. }
                | Operation::StableMemoryRead { .. }
                | Operation::StableMemorySize { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateStateSnapshot { .. } => "create_state_snapshot",
            Operation::DownloadStateSnapshot { .. } => "download_state_snapshot",
            Operation::ClearStateSnapshot { .. } => "clear_state_snapshot",
            Operation::AppendStateSnapshot { .. } => "append_state_snapshot",
            Operation::LoadStateSnapshot { .. } => "load_state_snapshot",
            Operation::StableMemoryRead { .. } => "stable_memory_read",
            Operation::StableMemoryWrite { .. } => "stable_memory_write",
            Operation::StableMemorySize { .. } => "stable_memory_size",
            Operation::StableMemoryGrow { .. } => "stable_memory_grow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    /// Snapshot length in bytes.
    Length(u64),
    Bytes(Vec<u8>),
    Unit,
    /// Region size in pages.
    Pages(u64),
    /// Previous page count, or -1 when growth was refused.
    Grow(i64),
}

/// Whole-call rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct Rejection {
    pub code: String,
    pub message: String,
}

impl From<VaultError> for Rejection {
    fn from(e: VaultError) -> Self {
        Rejection {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

impl Vault {
    /// Run one remote operation.
    pub fn dispatch(&mut self, op: Operation) -> Result<Reply, Rejection> {
        let name = op.name();
        let region = op.region();
        let res = match op {
            Operation::CreateStateSnapshot { region } => {
                self.create_snapshot(region).map(Reply::Length)
            }
            Operation::DownloadStateSnapshot {
                region,
                offset,
                length,
            } => self.download_snapshot(region, offset, length).map(Reply::Bytes),
            Operation::ClearStateSnapshot { region } => {
                self.clear_snapshot(region).map(|_| Reply::Unit)
            }
            Operation::AppendStateSnapshot { region, bytes } => {
                self.append_snapshot(region, &bytes).map(|_| Reply::Unit)
            }
            Operation::LoadStateSnapshot { region } => {
                self.load_snapshot(region).map(|_| Reply::Unit)
            }
            Operation::StableMemoryRead {
                region,
                offset,
                length,
            } => self.stable_read(region, offset, length).map(Reply::Bytes),
            Operation::StableMemoryWrite {
                region,
                offset,
                bytes,
            } => self
                .stable_write(region, offset, &bytes)
                .map(|_| Reply::Unit),
            Operation::StableMemorySize { region } => self.stable_size(region).map(Reply::Pages),
            Operation::StableMemoryGrow { region, pages } => {
                self.stable_grow(region, pages).map(Reply::Grow)
            }
        };
        match res {
            Ok(reply) => Ok(reply),
            Err(e) => {
                debug!("dispatch: {} on region {} rejected: {}", name, region, e);
                Err(e.into())
            }
        }
    }
}
