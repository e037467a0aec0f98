use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use StableVault::consts::{HEADER_PAGES, PAGE_SIZE};
use StableVault::{FileMemory, Memory, RegionId, RegionManager, VaultConfig, VaultError, VecMemory};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("svtest-{prefix}-{pid}-{t}-{id}.img"))
}

#[test]
fn capacity_is_non_decreasing_under_random_growth() -> Result<()> {
    let cfg = VaultConfig::default().with_span_pages(32);
    let mut rm = RegionManager::init(Box::new(VecMemory::with_max_pages(1 + 3 * 32)), &cfg)?;
    let ids = [RegionId::new(0), RegionId::new(1), RegionId::new(2)];
    for id in ids {
        rm.register(id)?;
    }

    let mut rng = oorandom::Rand32::new(0x5eed);
    let mut last = [0u64; 3];
    for _ in 0..200 {
        let i = rng.rand_range(0..3) as usize;
        let pages = rng.rand_range(0..6) as u64;
        let res = rm.grow(ids[i], pages);
        let now = rm.capacity_bytes(ids[i])?;
        match res {
            Ok(prev) => {
                assert_eq!(prev * PAGE_SIZE, last[i]);
                assert_eq!(now, last[i] + pages * PAGE_SIZE);
            }
            Err(VaultError::Capacity { .. }) => assert_eq!(now, last[i]),
            Err(e) => return Err(e.into()),
        }
        assert!(now >= last[i]);
        last[i] = now;

        // regions stay disjoint; grown ones are physically backed
        for (k, id) in ids.iter().enumerate() {
            let r = rm.region(*id)?;
            assert_eq!(r.base_page, HEADER_PAGES + k as u64 * 32);
            if r.page_count > 0 {
                assert!(r.base_page + r.page_count <= rm.physical_pages());
            }
        }
    }
    Ok(())
}

#[test]
fn out_of_capacity_access_fails() -> Result<()> {
    let cfg = VaultConfig::default().with_span_pages(4);
    let mut rm = RegionManager::init(Box::new(VecMemory::new()), &cfg)?;
    let id = RegionId::new(9);
    rm.register(id)?;
    rm.grow(id, 1)?;

    assert!(matches!(
        rm.read(id, PAGE_SIZE - 1, 2),
        Err(VaultError::OutOfBounds { .. })
    ));
    assert!(matches!(
        rm.write(id, PAGE_SIZE, b"x"),
        Err(VaultError::OutOfBounds { .. })
    ));
    assert!(matches!(
        rm.read(RegionId::new(10), 0, 1),
        Err(VaultError::UnknownRegion(_))
    ));
    assert!(matches!(
        RegionId::try_new(255),
        Err(VaultError::InvalidRegionId(255))
    ));
    Ok(())
}

#[test]
fn regions_survive_file_reopen() -> Result<()> {
    let path = unique_root("reopen");
    let cfg = VaultConfig::default().with_span_pages(16);
    let id = RegionId::new(2);

    {
        let mem = FileMemory::open(&path, &cfg)?;
        let mut rm = RegionManager::init(Box::new(mem), &cfg)?;
        rm.register(id)?;
        rm.grow(id, 3)?;
        rm.write(id, 2 * PAGE_SIZE + 5, b"persisted")?;
    }

    // a different configured span must not move anything
    let cfg2 = VaultConfig::default().with_span_pages(64);
    let mem = FileMemory::open(&path, &cfg2)?;
    assert!(mem.size() >= HEADER_PAGES + 2 * 16 + 3);
    let rm = RegionManager::init(Box::new(mem), &cfg2)?;
    assert_eq!(rm.span_pages(), 16);
    assert!(rm.is_registered(id));
    assert_eq!(rm.size(id)?, 3);
    assert_eq!(rm.read(id, 2 * PAGE_SIZE + 5, 9)?, b"persisted");

    let _ = std::fs::remove_file(&path);
    Ok(())
}

#[test]
fn unaligned_image_is_rejected() -> Result<()> {
    let path = unique_root("unaligned");
    std::fs::write(&path, b"short")?;
    assert!(FileMemory::open(&path, &VaultConfig::default()).is_err());
    let _ = std::fs::remove_file(&path);
    Ok(())
}
