//! End-to-end migration chain tests: v0 through v4, the live-storage
//! wrapper, and unknown-schema handling.

use favestore::{
    detect_version, migrate, migrate_data, pack_set, unpack_set, MemoryStorage, Result, Snapshot,
    StorageArea, StoreError, UpdateNotifier, STORAGE_SCHEMA_VERSION,
};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

fn snapshot(value: Value) -> Snapshot {
    value.as_object().unwrap().clone()
}

/// Storage wrapper counting write operations, to assert "no needless churn".
#[derive(Default)]
struct CountingStorage {
    inner: MemoryStorage,
    sets: AtomicUsize,
    removes: AtomicUsize,
}

impl CountingStorage {
    fn from_snapshot(data: Snapshot) -> Self {
        Self {
            inner: MemoryStorage::from_snapshot(data),
            ..Self::default()
        }
    }
}

impl StorageArea for CountingStorage {
    fn get_all(&self) -> Result<Snapshot> {
        self.inner.get_all()
    }

    fn set(&self, entries: Snapshot) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(entries)
    }

    fn remove(&self, keys: &[String]) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(keys)
    }

    fn clear(&self) -> Result<()> {
        self.inner.clear()
    }
}

struct RecordingNotifier {
    pinged: AtomicUsize,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            pinged: AtomicUsize::new(0),
        }
    }
}

impl UpdateNotifier for RecordingNotifier {
    fn request_update_check(&self) -> Result<()> {
        self.pinged.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingNotifier;

impl UpdateNotifier for FailingNotifier {
    fn request_update_check(&self) -> Result<()> {
        Err(StoreError::Corruption("update service unavailable".into()))
    }
}

// --- Pure chain ---

#[test]
fn test_full_chain_preserves_every_id() {
    // A v1 store large enough to span chunk boundaries.
    let branch: Vec<u64> = (0..700).collect();
    let storylet: Vec<u64> = (1000..1010).collect();
    let protects: Vec<u64> = (2000..2600).collect();
    let discards: Vec<u64> = vec![9001];

    let data = snapshot(json!({
        "branch_fave_array": branch,
        "storylet_fave_array": storylet,
        "card_protect_array": protects,
        "card_discard_array": discards,
    }));

    let migrated = migrate_data(&data).unwrap();

    assert_eq!(detect_version(&migrated), STORAGE_SCHEMA_VERSION);
    assert_eq!(unpack_set(&migrated, "branch_faves").len(), 700);
    assert_eq!(
        unpack_set(&migrated, "branch_faves"),
        (0..700).collect::<BTreeSet<u64>>()
    );
    assert_eq!(
        unpack_set(&migrated, "storylet_faves"),
        (1000..1010).collect::<BTreeSet<u64>>()
    );
    assert_eq!(
        unpack_set(&migrated, "card_faves"),
        (2000..2600).collect::<BTreeSet<u64>>()
    );
    assert_eq!(unpack_set(&migrated, "card_avoids"), [9001].into());
}

#[test]
fn test_v0_start_reaches_current() {
    let data = snapshot(json!({ "branch_faves": [7, 12] }));

    let migrated = migrate_data(&data).unwrap();

    assert_eq!(detect_version(&migrated), STORAGE_SCHEMA_VERSION);
    assert_eq!(unpack_set(&migrated, "branch_faves"), [7, 12].into());
    assert_eq!(migrated["click_protection"], json!("off"));
}

#[test]
fn test_chain_is_idempotent_from_every_version() {
    let starts = [
        snapshot(json!({ "branch_faves": [1, 2] })),
        snapshot(json!({ "branch_fave_array": [3], "storylet_fave_array": [4] })),
        {
            let mut v2 = snapshot(json!({ "block_action": "true" }));
            v2.append(&mut pack_set(&[701].into(), "card_protects"));
            v2
        },
        snapshot(json!({ "storage_schema": 3, "block_action": true })),
        Snapshot::new(),
    ];

    for start in starts {
        let once = migrate_data(&start).unwrap();
        let twice = migrate_data(&once).unwrap();
        assert_eq!(once, twice);
    }
}

#[test]
fn test_merge_does_not_lose_existing_target_data() {
    let mut data = snapshot(json!({ "storage_schema": 2 }));
    data.append(&mut pack_set(&[703, 704].into(), "card_faves"));
    data.append(&mut pack_set(&[701, 702].into(), "card_protects"));
    data.append(&mut pack_set(&[801].into(), "card_avoids"));
    data.append(&mut pack_set(&[802].into(), "card_discards"));

    let migrated = migrate_data(&data).unwrap();

    assert_eq!(
        unpack_set(&migrated, "card_faves"),
        [701, 702, 703, 704].into()
    );
    assert_eq!(unpack_set(&migrated, "card_avoids"), [801, 802].into());
    assert!(!migrated.keys().any(|k| k.starts_with("card_protects")));
    assert!(!migrated.keys().any(|k| k.starts_with("card_discards")));
}

// --- Live wrapper ---

#[test]
fn test_wrapper_migrates_and_removes_dropped_keys() {
    let mut data = snapshot(json!({ "storage_schema": 2 }));
    data.append(&mut pack_set(&[701, 702].into(), "card_protects"));

    let storage = MemoryStorage::from_snapshot(data);
    migrate(&storage, None).unwrap();

    let result = storage.snapshot();
    assert_eq!(result["storage_schema"], json!(4));
    assert_eq!(unpack_set(&result, "card_faves"), [701, 702].into());
    assert!(!result.contains_key("card_protects_keys"));
    assert!(!result.contains_key("card_protects_0"));
}

#[test]
fn test_wrapper_is_idempotent_on_storage() {
    let storage = MemoryStorage::from_snapshot(snapshot(json!({
        "branch_faves": [1, 2, 3],
    })));

    migrate(&storage, None).unwrap();
    let after_first = storage.snapshot();

    migrate(&storage, None).unwrap();
    assert_eq!(storage.snapshot(), after_first);
}

#[test]
fn test_wrapper_skips_writes_when_already_current() {
    let mut data = snapshot(json!({ "storage_schema": 4, "click_protection": "off" }));
    data.append(&mut pack_set(&[1, 2].into(), "branch_faves"));

    let storage = CountingStorage::from_snapshot(data);
    migrate(&storage, None).unwrap();

    assert_eq!(storage.sets.load(Ordering::SeqCst), 0);
    assert_eq!(storage.removes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_wrapper_survives_unknown_schema() {
    let data = snapshot(json!({ "storage_schema": 9, "precious": [1] }));
    let storage = CountingStorage::from_snapshot(data.clone());
    let notifier = RecordingNotifier::new();

    // Returns Ok, leaves the store untouched, and asks for an update check.
    migrate(&storage, Some(&notifier)).unwrap();

    assert_eq!(storage.inner.snapshot(), data);
    assert_eq!(storage.sets.load(Ordering::SeqCst), 0);
    assert_eq!(notifier.pinged.load(Ordering::SeqCst), 1);
}

#[test]
fn test_wrapper_swallows_notifier_failure() {
    let storage = MemoryStorage::from_snapshot(snapshot(json!({ "storage_schema": 9 })));

    migrate(&storage, Some(&FailingNotifier)).unwrap();

    assert_eq!(storage.snapshot()["storage_schema"], json!(9));
}
