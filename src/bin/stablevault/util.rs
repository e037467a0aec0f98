use anyhow::{anyhow, bail, Context, Result};
use std::fs::OpenOptions;
use std::io::Read;
use std::path::{Path, PathBuf};

use StableVault::util::decode_hex;
use StableVault::{FileMemory, RegionId, RegionManager, Value, VaultConfig};

pub fn decode_value_arg(arg: &str) -> Result<(Vec<u8>, &'static str)> {
    if arg == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok((buf, "stdin"));
    }
    if let Some(p) = arg.strip_prefix('@') {
        let path = PathBuf::from(p);
        return Ok((read_all(&path)?, "file"));
    }
    if let Some(hx) = arg.strip_prefix("hex:") {
        let v = decode_hex(hx).ok_or_else(|| anyhow!("invalid hex value"))?;
        return Ok((v, "hex"));
    }
    Ok((arg.as_bytes().to_vec(), "literal"))
}

/// Parse a typed scalar for `patch`.
pub fn decode_typed_value(arg: &str) -> Result<Value> {
    let (kind, raw) = arg
        .split_once(':')
        .ok_or_else(|| anyhow!("typed value must look like <type>:<value>, got '{}'", arg))?;
    let v = match kind {
        "u64" => Value::U64(raw.trim().parse::<u64>().with_context(|| format!("parse u64 '{}'", raw))?),
        "i64" => Value::I64(raw.trim().parse::<i64>().with_context(|| format!("parse i64 '{}'", raw))?),
        "f64" => Value::F64(raw.trim().parse::<f64>().with_context(|| format!("parse f64 '{}'", raw))?),
        "bool" => Value::Bool(raw.trim().parse::<bool>().with_context(|| format!("parse bool '{}'", raw))?),
        "str" => Value::Str(raw.to_string()),
        "hex" => Value::Bytes(decode_hex(raw).ok_or_else(|| anyhow!("invalid hex value"))?),
        other => bail!("unknown value type '{}' (u64, i64, f64, bool, str, hex)", other),
    };
    Ok(v)
}

pub fn read_all(p: &Path) -> Result<Vec<u8>> {
    let mut f = OpenOptions::new()
        .read(true)
        .open(p)
        .with_context(|| format!("open {}", p.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn region_id(raw: u8) -> Result<RegionId> {
    Ok(RegionId::try_new(raw)?)
}

/// Open an existing memory image.
pub fn open_image(path: &Path) -> Result<RegionManager> {
    if !path.exists() {
        bail!(
            "memory image {} does not exist (run `stablevault init` first)",
            path.display()
        );
    }
    let cfg = VaultConfig::from_env();
    let mem = FileMemory::open(path, &cfg)
        .with_context(|| format!("open memory image {}", path.display()))?;
    let rm = RegionManager::init(Box::new(mem), &cfg)
        .with_context(|| format!("load region table of {}", path.display()))?;
    Ok(rm)
}
