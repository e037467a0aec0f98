//! Error taxonomy shared by the region, upgrade and snapshot layers.

use thiserror::Error;

use crate::region::RegionId;

pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Growth denied: the region span or the host memory is exhausted.
    #[error("region {id}: cannot grow by {requested} page(s): {reason}")]
    Capacity {
        id: RegionId,
        requested: u64,
        reason: String,
    },

    #[error("region {id}: access [{offset}, +{len}) outside capacity {capacity} B")]
    OutOfBounds {
        id: RegionId,
        offset: u64,
        len: u64,
        capacity: u64,
    },

    #[error("region {id}: encode failed: {reason}")]
    Serialization { id: RegionId, reason: String },

    #[error("region {id}: decode failed: {reason}")]
    Deserialization { id: RegionId, reason: String },

    #[error("region {id}: out of sequence: {reason}")]
    Sequence { id: RegionId, reason: &'static str },

    #[error("region {0} is not registered")]
    UnknownRegion(RegionId),

    #[error("region id {0} is reserved")]
    InvalidRegionId(u8),

    #[error("region {0} already has a bound owner")]
    AlreadyBound(RegionId),

    #[error("vault is poisoned by a failed post-upgrade restore")]
    Poisoned,

    #[error("corrupt memory header: {0}")]
    CorruptHeader(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Stable short code, used for remote rejections.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Capacity { .. } => "capacity",
            VaultError::OutOfBounds { .. } => "out_of_bounds",
            VaultError::Serialization { .. } => "serialization",
            VaultError::Deserialization { .. } => "deserialization",
            VaultError::Sequence { .. } => "sequence",
            VaultError::UnknownRegion(_) => "unknown_region",
            VaultError::InvalidRegionId(_) => "invalid_region_id",
            VaultError::AlreadyBound(_) => "already_bound",
            VaultError::Poisoned => "poisoned",
            VaultError::CorruptHeader(_) => "corrupt_header",
            VaultError::Io(_) => "io",
        }
    }

    pub(crate) fn capacity(id: RegionId, requested: u64, reason: impl Into<String>) -> Self {
        VaultError::Capacity {
            id,
            requested,
            reason: reason.into(),
        }
    }
}
