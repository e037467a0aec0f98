use anyhow::Result;

use StableVault::consts::{DEFAULT_CHUNK_BYTES, DEFAULT_SPAN_PAGES};
use StableVault::{Memory, RegionId, Vault, VaultConfig, VecMemory};

// Single test touching SV_* so parallel tests never observe half-set variables.
#[test]
fn env_overlay_and_builder() -> Result<()> {
    let d = VaultConfig::default();
    assert_eq!(d.span_pages, DEFAULT_SPAN_PAGES);
    assert_eq!(d.chunk_bytes, DEFAULT_CHUNK_BYTES);
    assert_eq!(d.max_pages, None);

    std::env::set_var("SV_SPAN_PAGES", "128");
    std::env::set_var("SV_MAX_PAGES", "1000");
    std::env::set_var("SV_DATA_FSYNC", "yes");
    std::env::set_var("SV_CHUNK_BYTES", "not-a-number");
    let cfg = VaultConfig::from_env();
    for k in ["SV_SPAN_PAGES", "SV_MAX_PAGES", "SV_DATA_FSYNC", "SV_CHUNK_BYTES"] {
        std::env::remove_var(k);
    }

    assert_eq!(cfg.span_pages, 128);
    assert_eq!(cfg.max_pages, Some(1000));
    assert!(cfg.data_fsync);
    assert_eq!(cfg.chunk_bytes, DEFAULT_CHUNK_BYTES);

    let cfg = cfg.with_data_fsync(false).with_span_pages(16).build();
    assert!(!cfg.data_fsync);
    assert!(cfg.to_string().contains("span_pages: 16"));
    Ok(())
}

#[test]
fn configured_span_lays_out_a_fresh_memory() -> Result<()> {
    let mem = VecMemory::new();
    let mut v = Vault::open(mem.clone(), VaultConfig::default().with_span_pages(10))?;
    assert_eq!(v.regions().span_pages(), 10);
    assert_eq!(mem.size(), 1);

    // the facade never registers implicitly
    assert!(matches!(
        v.stable_grow(RegionId::new(5), 1),
        Err(StableVault::VaultError::UnknownRegion(_))
    ));
    assert_eq!(mem.size(), 1);
    Ok(())
}
