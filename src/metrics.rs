//! Lightweight global metrics for StableVault.
//!
//! Thread-safe relaxed atomic counters for:
//! - Regions (growth, refused growth)
//! - Upgrade hooks (frames written, restores, migrations)
//! - Snapshot transfer (create/download/append/load)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Regions -----
static REGION_GROW_CALLS: AtomicU64 = AtomicU64::new(0);
static REGION_PAGES_GROWN: AtomicU64 = AtomicU64::new(0);
static REGION_GROW_FAILURES: AtomicU64 = AtomicU64::new(0);

// ----- Upgrade hooks -----
static UPGRADE_FRAMES_WRITTEN: AtomicU64 = AtomicU64::new(0);
static UPGRADE_BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);
static UPGRADE_RESTORES: AtomicU64 = AtomicU64::new(0);
static UPGRADE_MIGRATIONS: AtomicU64 = AtomicU64::new(0);
static UPGRADE_FAILURES: AtomicU64 = AtomicU64::new(0);

// ----- Snapshot transfer -----
static SNAPSHOTS_CREATED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_BYTES_DOWNLOADED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_BYTES_APPENDED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_LOADED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_LOAD_FAILURES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    // Regions
    pub region_grow_calls: u64,
    pub region_pages_grown: u64,
    pub region_grow_failures: u64,

    // Upgrade hooks
    pub upgrade_frames_written: u64,
    pub upgrade_bytes_written: u64,
    pub upgrade_restores: u64,
    pub upgrade_migrations: u64,
    pub upgrade_failures: u64,

    // Snapshot transfer
    pub snapshots_created: u64,
    pub snapshot_bytes_downloaded: u64,
    pub snapshot_bytes_appended: u64,
    pub snapshots_loaded: u64,
    pub snapshot_load_failures: u64,
}

impl MetricsSnapshot {
    pub fn avg_pages_per_grow(&self) -> f64 {
        if self.region_grow_calls == 0 {
            0.0
        } else {
            self.region_pages_grown as f64 / self.region_grow_calls as f64
        }
    }
}

// ----- Recorders (Regions) -----
pub fn record_region_grow(pages: u64) {
    REGION_GROW_CALLS.fetch_add(1, Ordering::Relaxed);
    REGION_PAGES_GROWN.fetch_add(pages, Ordering::Relaxed);
}

pub fn record_region_grow_failed() {
    REGION_GROW_FAILURES.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Upgrade hooks) -----
pub fn record_upgrade_frame(bytes: usize) {
    UPGRADE_FRAMES_WRITTEN.fetch_add(1, Ordering::Relaxed);
    UPGRADE_BYTES_WRITTEN.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_upgrade_restore(migrated: bool) {
    UPGRADE_RESTORES.fetch_add(1, Ordering::Relaxed);
    if migrated {
        UPGRADE_MIGRATIONS.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_upgrade_failure() {
    UPGRADE_FAILURES.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Snapshot transfer) -----
pub fn record_snapshot_created() {
    SNAPSHOTS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_snapshot_download(bytes: usize) {
    SNAPSHOT_BYTES_DOWNLOADED.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_snapshot_append(bytes: usize) {
    SNAPSHOT_BYTES_APPENDED.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_snapshot_load(ok: bool) {
    if ok {
        SNAPSHOTS_LOADED.fetch_add(1, Ordering::Relaxed);
    } else {
        SNAPSHOT_LOAD_FAILURES.fetch_add(1, Ordering::Relaxed);
    }
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        region_grow_calls: REGION_GROW_CALLS.load(Ordering::Relaxed),
        region_pages_grown: REGION_PAGES_GROWN.load(Ordering::Relaxed),
        region_grow_failures: REGION_GROW_FAILURES.load(Ordering::Relaxed),

        upgrade_frames_written: UPGRADE_FRAMES_WRITTEN.load(Ordering::Relaxed),
        upgrade_bytes_written: UPGRADE_BYTES_WRITTEN.load(Ordering::Relaxed),
        upgrade_restores: UPGRADE_RESTORES.load(Ordering::Relaxed),
        upgrade_migrations: UPGRADE_MIGRATIONS.load(Ordering::Relaxed),
        upgrade_failures: UPGRADE_FAILURES.load(Ordering::Relaxed),

        snapshots_created: SNAPSHOTS_CREATED.load(Ordering::Relaxed),
        snapshot_bytes_downloaded: SNAPSHOT_BYTES_DOWNLOADED.load(Ordering::Relaxed),
        snapshot_bytes_appended: SNAPSHOT_BYTES_APPENDED.load(Ordering::Relaxed),
        snapshots_loaded: SNAPSHOTS_LOADED.load(Ordering::Relaxed),
        snapshot_load_failures: SNAPSHOT_LOAD_FAILURES.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    REGION_GROW_CALLS.store(0, Ordering::Relaxed);
    REGION_PAGES_GROWN.store(0, Ordering::Relaxed);
    REGION_GROW_FAILURES.store(0, Ordering::Relaxed);

    UPGRADE_FRAMES_WRITTEN.store(0, Ordering::Relaxed);
    UPGRADE_BYTES_WRITTEN.store(0, Ordering::Relaxed);
    UPGRADE_RESTORES.store(0, Ordering::Relaxed);
    UPGRADE_MIGRATIONS.store(0, Ordering::Relaxed);
    UPGRADE_FAILURES.store(0, Ordering::Relaxed);

    SNAPSHOTS_CREATED.store(0, Ordering::Relaxed);
    SNAPSHOT_BYTES_DOWNLOADED.store(0, Ordering::Relaxed);
    SNAPSHOT_BYTES_APPENDED.store(0, Ordering::Relaxed);
    SNAPSHOTS_LOADED.store(0, Ordering::Relaxed);
    SNAPSHOT_LOAD_FAILURES.store(0, Ordering::Relaxed);
}
