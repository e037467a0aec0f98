use anyhow::Result;
use serde::{Deserialize, Serialize};

use StableVault::codec::{decode_value, encode_value};
use StableVault::consts::DEFAULT_CHUNK_BYTES;
use StableVault::{Global, Phase, RegionId, Value, Vault, VaultConfig, VaultError, VecMemory};

const DATA: RegionId = RegionId::new(0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Data {
    field_one: String,
    field_two: u64,
}

impl Default for Data {
    fn default() -> Self {
        Data {
            field_one: "Hi World".to_string(),
            field_two: 55,
        }
    }
}

fn vault_with(global: &Global<Data>) -> Result<Vault> {
    let mut v = Vault::open(VecMemory::new(), VaultConfig::default())?;
    v.register_global(DATA, global.clone())?;
    Ok(v)
}

fn download_all(v: &Vault, id: RegionId, len: u64, chunk: u64) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(len as usize);
    while (out.len() as u64) < len {
        out.extend(v.download_snapshot(id, out.len() as u64, chunk)?);
    }
    Ok(out)
}

fn upload_all(v: &mut Vault, id: RegionId, blob: &[u8], chunk: usize) -> Result<()> {
    v.clear_snapshot(id)?;
    for part in blob.chunks(chunk) {
        v.append_snapshot(id, part)?;
    }
    v.load_snapshot(id)?;
    Ok(())
}

#[test]
fn field_two_end_to_end() -> Result<()> {
    let data = Global::new(Data::default());
    let mut v = vault_with(&data)?;
    assert_eq!(v.phase(), Phase::Init);

    let len = v.create_snapshot(DATA)?;
    assert_eq!(v.phase(), Phase::Running);
    let first = decode_value(&download_all(&v, DATA, len, 7)?)?;
    assert_eq!(first.field(1), Some(&Value::U64(55)));

    data.with_mut(|d| d.field_two = 102154646898);
    let len = v.create_snapshot(DATA)?;

    let blob = download_all(&v, DATA, len, 7)?;
    assert_eq!(blob.len() as u64, len);

    // operator patches field_two without the program's types
    let mut tree = decode_value(&blob)?;
    assert_eq!(tree.field(1), Some(&Value::U64(102154646898)));
    tree.set_field(1, Value::U64(200321321))
        .map_err(|_| anyhow::anyhow!("not a record"))?;
    let patched = encode_value(&tree)?;

    upload_all(&mut v, DATA, &patched, 5)?;
    assert_eq!(data.with(|d| d.field_two), 200321321);
    assert_eq!(data.with(|d| d.field_one.clone()), "Hi World");
    assert_eq!(v.upload_cursor(DATA), None);
    Ok(())
}

#[test]
fn create_snapshot_is_repeatable() -> Result<()> {
    let data = Global::new(Data::default());
    let mut v = vault_with(&data)?;

    let a_len = v.create_snapshot(DATA)?;
    let a = download_all(&v, DATA, a_len, 1 << 20)?;
    let b_len = v.create_snapshot(DATA)?;
    let b = download_all(&v, DATA, b_len, 1 << 20)?;
    assert_eq!(a_len, b_len);
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn chunked_upload_reproduces_download() -> Result<()> {
    // big enough for two full transfer chunks plus a tail
    let big = Data {
        field_one: "x".repeat(2 * DEFAULT_CHUNK_BYTES + 123_456),
        field_two: 1,
    };
    let data = Global::new(big.clone());
    let mut v = vault_with(&data)?;

    let len = v.create_snapshot(DATA)?;
    assert!(len > 2 * DEFAULT_CHUNK_BYTES as u64);
    let blob = download_all(&v, DATA, len, DEFAULT_CHUNK_BYTES as u64)?;

    data.replace(Data::default());
    v.clear_snapshot(DATA)?;
    let sizes = [
        DEFAULT_CHUNK_BYTES,
        DEFAULT_CHUNK_BYTES,
        blob.len() - 2 * DEFAULT_CHUNK_BYTES,
    ];
    let mut at = 0;
    for n in sizes {
        v.append_snapshot(DATA, &blob[at..at + n])?;
        at += n;
        assert_eq!(v.upload_cursor(DATA), Some(at as u64));
    }
    // the region now holds exactly the uploaded bytes
    assert_eq!(download_all(&v, DATA, len, 999_999)?, blob);

    v.load_snapshot(DATA)?;
    assert_eq!(data.get(), big);
    Ok(())
}

#[test]
fn downloads_clamp_past_the_end() -> Result<()> {
    let data = Global::new(Data::default());
    let mut v = vault_with(&data)?;
    let len = v.create_snapshot(DATA)?;

    let tail = v.download_snapshot(DATA, len - 3, 100)?;
    assert_eq!(tail.len(), 3);
    assert!(v.download_snapshot(DATA, len, 1)?.is_empty());
    assert!(v.download_snapshot(DATA, u64::MAX, u64::MAX)?.is_empty());
    Ok(())
}

#[test]
fn append_and_load_need_a_clear_first() -> Result<()> {
    let data = Global::new(Data::default());
    let mut v = vault_with(&data)?;

    assert!(matches!(
        v.append_snapshot(DATA, b"abc"),
        Err(VaultError::Sequence { .. })
    ));
    assert!(matches!(
        v.load_snapshot(DATA),
        Err(VaultError::Sequence { .. })
    ));

    // create discards an open upload
    v.clear_snapshot(DATA)?;
    v.create_snapshot(DATA)?;
    assert!(matches!(
        v.append_snapshot(DATA, b"abc"),
        Err(VaultError::Sequence { .. })
    ));

    let other = RegionId::new(1);
    assert!(matches!(
        v.clear_snapshot(other),
        Err(VaultError::UnknownRegion(_))
    ));
    assert!(matches!(
        v.download_snapshot(other, 0, 1),
        Err(VaultError::UnknownRegion(_))
    ));
    Ok(())
}

#[test]
fn failed_load_keeps_owner_and_cursor() -> Result<()> {
    let data = Global::new(Data::default());
    let mut v = vault_with(&data)?;
    let len = v.create_snapshot(DATA)?;
    let blob = download_all(&v, DATA, len, 64)?;

    data.with_mut(|d| d.field_two = 7);
    v.clear_snapshot(DATA)?;
    v.append_snapshot(DATA, &blob[..blob.len() - 4])?;

    let err = v.load_snapshot(DATA).unwrap_err();
    assert!(matches!(err, VaultError::Deserialization { .. }));
    assert_eq!(data.with(|d| d.field_two), 7);
    assert_eq!(v.phase(), Phase::Running);

    // the missing tail can still be appended
    v.append_snapshot(DATA, &blob[blob.len() - 4..])?;
    v.load_snapshot(DATA)?;
    assert_eq!(data.get(), Data::default());
    Ok(())
}

#[test]
fn loading_an_empty_upload_is_a_decode_failure() -> Result<()> {
    let data = Global::new(Data::default());
    let mut v = vault_with(&data)?;

    // region 0 has no pages yet
    v.clear_snapshot(DATA)?;
    let err = v.load_snapshot(DATA).unwrap_err();
    assert!(matches!(err, VaultError::Deserialization { .. }));
    assert_eq!(data.get(), Data::default());
    assert_eq!(v.upload_cursor(DATA), Some(0));
    assert!(v.download_snapshot(DATA, 0, 16)?.is_empty());
    Ok(())
}
