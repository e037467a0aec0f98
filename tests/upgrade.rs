use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use serde::de::Deserializer;
use serde::ser::{Error as _, Serializer};
use serde::{Deserialize, Serialize};

use StableVault::{
    FileMemory, Global, Persist, Phase, RegionId, Vault, VaultConfig, VaultError, VecMemory,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("svtest-upgrade-{prefix}-{pid}-{t}-{id}.img"))
}

const USERS: RegionId = RegionId::new(0);
const COUNTERS: RegionId = RegionId::new(1);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Users {
    names: Vec<String>,
    admin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Counters {
    hits: u64,
    per_page: std::collections::BTreeMap<String, u64>,
}

fn cfg() -> VaultConfig {
    VaultConfig::default().with_span_pages(64)
}

#[test]
fn upgrade_roundtrip_keeps_encoded_bytes() -> Result<()> {
    let mem = VecMemory::new();

    let users = Global::new(Users {
        names: vec!["ann".into(), "bob".into()],
        admin: Some("ann".into()),
    });
    let counters = Global::new(Counters::default());
    counters.with_mut(|c| {
        c.hits = 3;
        c.per_page.insert("/".into(), 3);
    });
    let before = (users.with(|u| u.encode())?, counters.with(|c| c.encode())?);

    {
        let mut v = Vault::open(mem.clone(), cfg())?;
        v.register_global(USERS, users.clone())?;
        v.register_global(COUNTERS, counters.clone())?;
        v.pre_upgrade()?;
        assert_eq!(v.phase(), Phase::Running);
    }

    // new code generation over the same memory
    let users2: Global<Users> = Global::default();
    let counters2: Global<Counters> = Global::default();
    let mut v = Vault::open(mem.clone(), cfg())?;
    v.restore_global(USERS, users2.clone())?;
    v.restore_global(COUNTERS, counters2.clone())?;

    assert_eq!(users2.get(), users.get());
    assert_eq!(counters2.get(), counters.get());
    let after = (users2.with(|u| u.encode())?, counters2.with(|c| c.encode())?);
    assert_eq!(before, after);
    assert_eq!(v.bound_ids(), vec![USERS, COUNTERS]);

    // restored owners are bound: snapshots work without register_global
    assert!(v.create_snapshot(USERS)? > 0);
    Ok(())
}

#[test]
fn upgrade_survives_process_restart_on_file_memory() -> Result<()> {
    let path = unique_root("file");
    let users = Global::new(Users {
        names: vec!["carol".into()],
        admin: None,
    });
    {
        let mut v = Vault::open(FileMemory::open(&path, &cfg())?, cfg())?;
        v.register_global(USERS, users.clone())?;
        v.pre_upgrade()?;
    }

    let restored: Global<Users> = Global::default();
    let mut v = Vault::open(FileMemory::open(&path, &cfg())?, cfg())?;
    v.restore_global(USERS, restored.clone())?;
    assert_eq!(restored.get(), users.get());

    let _ = std::fs::remove_file(&path);
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileV1 {
    name: String,
    age: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ProfileV2 {
    name: String,
    age: u32,
    email: String,
}

#[test]
fn prior_schema_is_migrated() -> Result<()> {
    let mem = VecMemory::new();
    {
        let mut v = Vault::open(mem.clone(), cfg())?;
        v.register_global(
            USERS,
            Global::new(ProfileV1 {
                name: "dora".into(),
                age: 41,
            }),
        )?;
        v.pre_upgrade()?;
    }

    let profile: Global<ProfileV2> = Global::new(ProfileV2 {
        name: String::new(),
        age: 0,
        email: String::new(),
    });
    let mut v = Vault::open(mem.clone(), cfg())?;
    v.post_upgrade(
        USERS,
        profile.clone(),
        Some(|old: ProfileV1| ProfileV2 {
            name: old.name,
            age: old.age,
            email: "unknown@example.org".into(),
        }),
    )?;
    assert_eq!(
        profile.get(),
        ProfileV2 {
            name: "dora".into(),
            age: 41,
            email: "unknown@example.org".into(),
        }
    );
    assert_eq!(v.phase(), Phase::Running);

    // the next upgrade writes the new schema, which decodes without migration
    v.pre_upgrade()?;
    let again: Global<ProfileV2> = Global::new(profile.get());
    let mut v2 = Vault::open(mem, cfg())?;
    v2.restore_global(USERS, again.clone())?;
    assert_eq!(again.get(), profile.get());
    Ok(())
}

#[test]
fn undecodable_region_poisons_the_vault() -> Result<()> {
    let mem = VecMemory::new();
    {
        let mut v = Vault::open(mem.clone(), cfg())?;
        v.register_global(USERS, Global::new(Users::default()))?;
        v.pre_upgrade()?;
    }

    let wrong: Global<Counters> = Global::new(Counters {
        hits: 9,
        ..Default::default()
    });
    let mut v = Vault::open(mem, cfg())?;
    let err = v.restore_global(USERS, wrong.clone()).unwrap_err();
    assert!(matches!(err, VaultError::Deserialization { .. }));
    assert_eq!(v.phase(), Phase::Poisoned);
    assert_eq!(wrong.with(|c| c.hits), 9);

    assert!(matches!(v.pre_upgrade(), Err(VaultError::Poisoned)));
    assert!(matches!(
        v.stable_size(USERS),
        Err(VaultError::Poisoned)
    ));
    assert!(matches!(
        v.register_global(COUNTERS, Global::new(Counters::default())),
        Err(VaultError::Poisoned)
    ));
    Ok(())
}

#[test]
fn empty_region_is_a_decode_failure() -> Result<()> {
    let mut v = Vault::open(VecMemory::new(), cfg())?;
    let err = v
        .restore_global(COUNTERS, Global::new(Counters::default()))
        .unwrap_err();
    match &err {
        VaultError::Deserialization { reason, .. } => {
            assert!(reason.contains("unexpected end of input"), "{}", reason)
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(v.phase(), Phase::Poisoned);
    Ok(())
}

/// A value that refuses to serialize.
#[derive(Debug, Default)]
struct Broken;

impl Serialize for Broken {
    fn serialize<S: Serializer>(&self, _s: S) -> std::result::Result<S::Ok, S::Error> {
        Err(S::Error::custom("broken on purpose"))
    }
}

impl<'de> Deserialize<'de> for Broken {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        <()>::deserialize(d).map(|_| Broken)
    }
}

#[test]
fn pre_upgrade_is_all_or_nothing() -> Result<()> {
    let users = Global::new(Users {
        names: vec!["eve".into()],
        admin: None,
    });
    let mut v = Vault::open(VecMemory::new(), cfg())?;
    v.register_global(USERS, users.clone())?;
    v.register_global(COUNTERS, Global::new(Broken))?;

    let len = v.create_snapshot(USERS)?;
    let stored = v.download_snapshot(USERS, 0, len)?;

    users.with_mut(|u| u.names.push("mallory".into()));
    let err = v.pre_upgrade().unwrap_err();
    assert!(matches!(err, VaultError::Serialization { id, .. } if id == COUNTERS));
    assert_eq!(v.phase(), Phase::Running);

    // USERS still holds the earlier snapshot, not the new state
    assert_eq!(v.download_snapshot(USERS, 0, u64::MAX)?, stored);
    Ok(())
}

#[test]
fn capacity_failure_aborts_before_writing() -> Result<()> {
    let small = VaultConfig::default().with_span_pages(2);
    let users = Global::new(Users {
        names: vec!["frank".into()],
        admin: None,
    });
    let huge = Global::new(Users {
        names: vec!["z".repeat(3 * 65536)],
        admin: None,
    });
    let mut v = Vault::open(VecMemory::new(), small)?;
    v.register_global(USERS, users)?;
    v.register_global(COUNTERS, huge)?;

    assert!(matches!(
        v.pre_upgrade(),
        Err(VaultError::Capacity { .. })
    ));
    assert_eq!(v.regions().region(USERS)?.logical_length, 0);
    Ok(())
}

#[test]
fn binding_twice_is_rejected() -> Result<()> {
    let mut v = Vault::open(VecMemory::new(), cfg())?;
    v.register_global(USERS, Global::new(Users::default()))?;
    assert!(matches!(
        v.register_global(USERS, Global::new(Users::default())),
        Err(VaultError::AlreadyBound(_))
    ));
    assert!(v.is_bound(USERS));
    assert!(!v.is_bound(COUNTERS));
    Ok(())
}
