//! Centralized configuration for StableVault.
//!
//! - `VaultConfig::default()` gives the production defaults.
//! - `VaultConfig::from_env()` overlays the `SV_*` environment variables.
//! - Fluent `with_*` setters override single fields (builder-style).
//!
//! Env variables:
//! - SV_SPAN_PAGES: virtual span reserved per region, in pages (default 8192).
//!   Only used when formatting a blank memory; an existing header wins.
//! - SV_MAX_PAGES: cap on physical pages the host grants (default: unlimited).
//! - SV_DATA_FSYNC: fsync the memory image after writes/growth (FileMemory only).
//! - SV_CHUNK_BYTES: chunk size used by the operator tool for export/import.

use std::fmt;

use crate::consts::{DEFAULT_CHUNK_BYTES, DEFAULT_SPAN_PAGES};

#[derive(Clone, Debug)]
pub struct VaultConfig {
    /// Pages of virtual address space reserved for each region id.
    pub span_pages: u64,

    /// Upper bound on physical pages (None = unlimited). Models the host refusing growth.
    pub max_pages: Option<u64>,

    /// Whether FileMemory fsyncs data on every write/grow.
    pub data_fsync: bool,

    /// Chunk size for chunked snapshot export/import.
    pub chunk_bytes: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            span_pages: DEFAULT_SPAN_PAGES,
            max_pages: None,
            data_fsync: false,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }
}

fn env_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "yes" || s == "on"
}

impl VaultConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SV_SPAN_PAGES") {
            if let Ok(n) = v.trim().parse::<u64>() {
                if n > 0 {
                    cfg.span_pages = n;
                }
            }
        }

        if let Ok(v) = std::env::var("SV_MAX_PAGES") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.max_pages = Some(n);
            }
        }

        if let Ok(v) = std::env::var("SV_DATA_FSYNC") {
            cfg.data_fsync = env_flag(&v);
        }

        if let Ok(v) = std::env::var("SV_CHUNK_BYTES") {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.chunk_bytes = n;
                }
            }
        }

        cfg
    }

    pub fn with_span_pages(mut self, pages: u64) -> Self {
        self.span_pages = pages.max(1);
        self
    }

    pub fn with_max_pages(mut self, pages: Option<u64>) -> Self {
        self.max_pages = pages;
        self
    }

    pub fn with_data_fsync(mut self, on: bool) -> Self {
        self.data_fsync = on;
        self
    }

    pub fn with_chunk_bytes(mut self, bytes: usize) -> Self {
        self.chunk_bytes = bytes.max(1);
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Self {
        self
    }
}

impl fmt::Display for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VaultConfig {{ span_pages: {}, max_pages: {}, data_fsync: {}, chunk_bytes: {} }}",
            self.span_pages,
            self.max_pages
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unlimited".to_string()),
            self.data_fsync,
            self.chunk_bytes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = VaultConfig::default()
            .with_span_pages(0)
            .with_max_pages(Some(40))
            .with_chunk_bytes(4096)
            .build();
        assert_eq!(cfg.span_pages, 1);
        assert_eq!(cfg.max_pages, Some(40));
        assert_eq!(cfg.chunk_bytes, 4096);
        assert!(!cfg.data_fsync);
        assert!(cfg.to_string().contains("max_pages: 40"));
    }
}
