//! codec: deterministic, self-describing binary encoding of owner values.
//!
//! Two tiers:
//! - serde <-> `Value` (ser.rs / de.rs): structs become `Record`s keyed by field
//!   declaration index, enums become `Variant`s keyed by variant index.
//! - `Value` <-> bytes (wire.rs): tagged, length-prefixed, CRC32-protected payload.
//!
//! Because the payload carries its own structure, an operator tool can decode a snapshot
//! into a `Value`, patch one field and re-encode it without the owning program's types.
//!
//! Determinism: map entries are emitted sorted by their encoded key bytes, so two maps
//! with the same contents encode identically whatever their iteration order was.
//! Order-sensitive map types (IndexMap and the like) therefore come back re-ordered.
//!
//! Limitations: internally tagged / untagged enums are not supported (they need field
//! names, which the format does not carry). Fields marked `skip_serializing` must also be
//! `skip_deserializing`, otherwise field indexes shift.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

mod de;
mod ser;
mod value;
mod wire;

pub use de::from_value;
pub use ser::to_value;
pub use value::Value;
pub use wire::{decode_value, encode_value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("{0}")]
    Custom(String),

    #[error("bad payload magic")]
    BadMagic,

    #[error("payload checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    Checksum { stored: u32, computed: u32 },

    #[error("unexpected end of input at byte {0}")]
    Eof(usize),

    #[error("unknown value tag {tag:#04x} at byte {pos}")]
    BadTag { tag: u8, pos: usize },

    #[error("{0} trailing byte(s) after value")]
    Trailing(usize),

    #[error("invalid utf-8 in string at byte {0}")]
    Utf8(usize),

    #[error("invalid char {0:#x}")]
    BadChar(u32),

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("{what} of {len} exceeds the format limit")]
    TooLarge { what: &'static str, len: usize },

    #[error("expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },
}

impl serde::ser::Error for CodecError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        CodecError::Custom(msg.to_string())
    }
}

impl serde::de::Error for CodecError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        CodecError::Custom(msg.to_string())
    }
}

/// Encode any serde value into a snapshot payload.
pub fn encode<T: Serialize + ?Sized>(v: &T) -> Result<Vec<u8>, CodecError> {
    encode_value(&to_value(v)?)
}

/// Decode a snapshot payload into `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    from_value(decode_value(bytes)?)
}

/// How a global value is turned into bytes for upgrades and snapshots.
///
/// Implemented for every `Serialize + DeserializeOwned` type with the codec above.
pub trait Persist: Sized {
    fn encode(&self) -> Result<Vec<u8>, CodecError>;
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

impl<T: Serialize + DeserializeOwned> Persist for T {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        encode(self)
    }
    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes)
    }
}
