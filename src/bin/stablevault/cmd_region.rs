use anyhow::{bail, Context, Result};
use serde_json::json;
use std::path::PathBuf;

use StableVault::consts::PAGE_SIZE;
use StableVault::metrics;
use StableVault::util::hex_dump;
use StableVault::{FileMemory, RegionManager, VaultConfig};

use super::util::{decode_value_arg, open_image, region_id};

pub fn exec_init(path: PathBuf, span_pages: Option<u64>) -> Result<()> {
    if path.exists() && std::fs::metadata(&path)?.len() > 0 {
        bail!("{} already exists and is not empty", path.display());
    }
    let mut cfg = VaultConfig::from_env();
    if let Some(n) = span_pages {
        cfg = cfg.with_span_pages(n);
    }
    let mem = FileMemory::open(&path, &cfg)
        .with_context(|| format!("create memory image {}", path.display()))?;
    let rm = RegionManager::init(Box::new(mem), &cfg)?;
    println!(
        "OK init: {} (span_pages={}, {} page(s))",
        path.display(),
        rm.span_pages(),
        rm.physical_pages()
    );
    Ok(())
}

pub fn exec_status(path: PathBuf, json: bool) -> Result<()> {
    let rm = open_image(&path)?;
    let regions = rm.regions()?;

    if json {
        let ms = metrics::snapshot();
        let out = json!({
            "path": path.display().to_string(),
            "page_size": PAGE_SIZE,
            "span_pages": rm.span_pages(),
            "physical_pages": rm.physical_pages(),
            "regions": regions,
            "metrics": {
                "region_grow_calls": ms.region_grow_calls,
                "region_pages_grown": ms.region_pages_grown,
                "region_grow_failures": ms.region_grow_failures,
            },
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Memory image {}", path.display());
    println!("  page_size      = {}", PAGE_SIZE);
    println!("  span_pages     = {}", rm.span_pages());
    println!("  physical_pages = {}", rm.physical_pages());
    println!("Regions: {}", regions.len());
    if regions.is_empty() {
        println!("  (none)");
    }
    for r in &regions {
        println!(
            "  - {:3}  base_page={:<10} pages={:<6} capacity={} B  frame={} B",
            r.id,
            r.base_page,
            r.page_count,
            r.capacity_bytes(),
            r.logical_length
        );
    }
    Ok(())
}

pub fn exec_read(
    path: PathBuf,
    region: u8,
    offset: u64,
    len: u64,
    out: Option<PathBuf>,
) -> Result<()> {
    let id = region_id(region)?;
    let rm = open_image(&path)?;
    let bytes = rm
        .read(id, offset, len)
        .with_context(|| format!("read region {} [{}, +{})", id, offset, len))?;
    match out {
        Some(p) => {
            std::fs::write(&p, &bytes).with_context(|| format!("write {}", p.display()))?;
            println!("OK read: {} B -> {}", bytes.len(), p.display());
        }
        None => println!("{}", hex_dump(&bytes)),
    }
    Ok(())
}

pub fn exec_write(path: PathBuf, region: u8, offset: u64, value: String) -> Result<()> {
    let id = region_id(region)?;
    let (bytes, source) = decode_value_arg(&value)?;
    let mut rm = open_image(&path)?;
    rm.write(id, offset, &bytes)
        .with_context(|| format!("write region {} at {}", id, offset))?;
    println!(
        "OK write: region {} offset {} ({} B from {})",
        id,
        offset,
        bytes.len(),
        source
    );
    Ok(())
}

pub fn exec_grow(path: PathBuf, region: u8, pages: u64) -> Result<()> {
    let id = region_id(region)?;
    let mut rm = open_image(&path)?;
    rm.register(id)?;
    let prev = rm
        .grow(id, pages)
        .with_context(|| format!("grow region {} by {} page(s)", id, pages))?;
    println!(
        "OK grow: region {} {} -> {} page(s)",
        id,
        prev,
        rm.size(id)?
    );
    Ok(())
}
