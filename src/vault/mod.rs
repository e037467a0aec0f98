//! vault: owner bindings, upgrade hooks and the raw facade.
//!
//! Submodules:
//! - core.rs: Vault, Phase, type-erased owner slots, register_global.
//! - global.rs: Global<T>, the shared owner handle.
//! - upgrade.rs: pre_upgrade / post_upgrade (with migration).
//! - stable.rs: stable_read / stable_write / stable_size / stable_grow.
//!
//! The snapshot transfer operations are also methods of Vault (see crate::snapshot).

pub mod core;
pub mod global;
pub mod stable;
pub mod upgrade;

pub use self::core::{Phase, Vault};
pub use global::Global;
