#![allow(non_snake_case)]

// Base modules
pub mod consts;
pub mod error;
pub mod config;
pub mod metrics;
pub mod meta;

// Physical memory and the region table
pub mod memory; // src/memory/{mod,vec,file}.rs
pub mod region; // src/region/{mod,core,alloc,io}.rs

// Self-describing value encoding
pub mod codec; // src/codec/{mod,value,ser,de,wire}.rs

// Owners, upgrade hooks, raw facade
pub mod vault; // src/vault/{mod,core,global,upgrade,stable}.rs

// Frames and chunked transfer
pub mod snapshot; // src/snapshot/{mod,transfer}.rs

// Remote operations
pub mod api;

// Helpers (hex)
pub mod util;

// Convenience re-exports
pub use api::{Operation, Rejection, Reply};
pub use codec::{decode, encode, CodecError, Persist, Value};
pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use memory::{FileMemory, Memory, VecMemory};
pub use region::{RegionId, RegionManager, VirtualRegion};
pub use vault::{Global, Phase, Vault};
