use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use StableVault::codec::{decode_value, encode_value};
use StableVault::snapshot::{append_frame, clear_frame, frame_len, read_payload};
use StableVault::util::to_hex;
use StableVault::VaultConfig;

use super::util::{decode_typed_value, open_image, read_all, region_id};

fn chunk_size(arg: Option<usize>) -> usize {
    arg.unwrap_or_else(|| VaultConfig::from_env().chunk_bytes).max(1)
}

/// Chunked download of the frame payload of a region.
pub fn exec_export(path: PathBuf, region: u8, out: PathBuf, chunk_bytes: Option<usize>) -> Result<()> {
    let id = region_id(region)?;
    let chunk = chunk_size(chunk_bytes) as u64;
    let rm = open_image(&path)?;
    let total = frame_len(&rm, id)?;

    let mut f = fs::File::create(&out).with_context(|| format!("create {}", out.display()))?;
    let mut offset = 0u64;
    let mut chunks = 0usize;
    while offset < total {
        let part = read_payload(&rm, id, offset, chunk)?;
        if part.is_empty() {
            break;
        }
        f.write_all(&part)?;
        offset += part.len() as u64;
        chunks += 1;
    }
    f.sync_all()?;
    println!(
        "OK export: region {} -> {} ({} B in {} chunk(s))",
        id,
        out.display(),
        offset,
        chunks
    );
    Ok(())
}

/// Validate a blob, then clear the region frame and append it in chunks.
pub fn exec_import(path: PathBuf, region: u8, from: PathBuf, chunk_bytes: Option<usize>) -> Result<()> {
    let id = region_id(region)?;
    let chunk = chunk_size(chunk_bytes);
    let blob = read_all(&from)?;
    decode_value(&blob).with_context(|| format!("{} is not a valid snapshot", from.display()))?;

    let mut rm = open_image(&path)?;
    rm.register(id)?;
    clear_frame(&mut rm, id)?;
    let mut at = 0u64;
    let mut chunks = 0usize;
    for part in blob.chunks(chunk) {
        at = append_frame(&mut rm, id, at, part)
            .with_context(|| format!("append chunk {} to region {}", chunks, id))?;
        chunks += 1;
    }
    println!(
        "OK import: {} -> region {} ({} B in {} chunk(s))",
        from.display(),
        id,
        at,
        chunks
    );
    Ok(())
}

pub fn exec_inspect(file: PathBuf, json: bool) -> Result<()> {
    let blob = read_all(&file)?;
    let value = decode_value(&blob).with_context(|| format!("decode {}", file.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Snapshot {} ({} B)", file.display(), blob.len());
        println!("  header = {}", to_hex(&blob[..blob.len().min(8)]));
        println!("{:#?}", value);
    }
    Ok(())
}

/// Field-level patch: decode, replace one node, re-encode.
pub fn exec_patch(file: PathBuf, field: String, value: String, out: PathBuf) -> Result<()> {
    let blob = read_all(&file)?;
    let mut tree = decode_value(&blob).with_context(|| format!("decode {}", file.display()))?;
    let new = decode_typed_value(&value)?;

    let slot = tree
        .at_path_mut(&field)
        .ok_or_else(|| anyhow!("no field at path '{}'", field))?;
    let old = std::mem::replace(slot, new);

    let bytes = encode_value(&tree)?;
    fs::write(&out, &bytes).with_context(|| format!("write {}", out.display()))?;
    println!(
        "OK patch: field {} {:?} -> {:?} ({} B -> {})",
        field,
        old,
        tree.at_path(&field),
        bytes.len(),
        out.display()
    );
    Ok(())
}
