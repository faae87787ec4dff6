//! Storage schema migration.
//!
//! [`migrate_data`] is a pure chain of single-step upgrades: each step takes
//! a snapshot at version N, returns a new snapshot stamped N+1, and the
//! chain repeats until the current version is reached. Steps never mutate
//! their input — every transform is a shallow copy plus explicit overrides
//! and deletions, which keeps the whole chain testable without a storage
//! harness.
//!
//! Steps leave superseded keys behind where the original data is still the
//! canonical copy (a crash between the wrapper's write and remove must lose
//! nothing); the cleanup sweep retires them afterwards.

use crate::chunks::{pack_set, unpack_set};
use crate::error::{Result, StoreError};
use crate::storage::StorageArea;
use crate::types::{Snapshot, SCHEMA_VERSION_KEY, STORAGE_SCHEMA_VERSION};
use crate::version::detect_version;
use serde_json::Value;
use std::collections::BTreeSet;

/// Hook for requesting an extension update check when storage turns out to
/// be written by a newer release than this one. Best-effort only.
pub trait UpdateNotifier {
    fn request_update_check(&self) -> Result<()>;
}

/// Upgrade a raw snapshot to the current schema version.
///
/// Returns the input unchanged (cloned) when it is already current, so the
/// full chain is idempotent. Fails with [`StoreError::UnknownSchema`] when
/// the detected version is outside the known chain — typically data synced
/// from a newer release — rather than guessing.
pub fn migrate_data(data: &Snapshot) -> Result<Snapshot> {
    let detected = detect_version(data);

    if detected == STORAGE_SCHEMA_VERSION {
        return Ok(data.clone());
    }

    if detected > STORAGE_SCHEMA_VERSION {
        return Err(StoreError::unknown_schema(detected));
    }

    let mut snapshot = data.clone();
    let mut version = detected;

    // Bounded loop: at most one step per missing version. A step that fails
    // to advance the detected version would otherwise spin forever.
    for _ in 0..(STORAGE_SCHEMA_VERSION - detected) {
        snapshot = match version {
            0 => step_rename_legacy_array(snapshot),
            1 => step_pack_legacy_arrays(snapshot),
            2 => step_rename_card_categories(snapshot),
            3 => step_click_protection_enum(snapshot),
            other => return Err(StoreError::unknown_schema(other)),
        };

        let next = detect_version(&snapshot);
        if next <= version {
            return Err(StoreError::Corruption(format!(
                "migration step from schema version {version} did not advance (still {next})"
            )));
        }

        version = next;
        if version == STORAGE_SCHEMA_VERSION {
            return Ok(snapshot);
        }
    }

    Err(StoreError::Corruption(format!(
        "migration stalled at schema version {version}"
    )))
}

/// v0 → v1: the favourites array moved to its own key.
fn step_rename_legacy_array(data: Snapshot) -> Snapshot {
    let mut next = data;

    if let Some(faves) = next.get("branch_faves") {
        if !faves.is_null() {
            next.insert("branch_fave_array".to_string(), faves.clone());
        }
    }

    stamp(next, 1)
}

/// v1 → v2: plain arrays become packed sets under the v2 category names.
fn step_pack_legacy_arrays(data: Snapshot) -> Snapshot {
    let mut next = data;

    for (array_key, category) in [
        ("branch_fave_array", "branch_faves"),
        ("storylet_fave_array", "storylet_faves"),
        ("card_protect_array", "card_protects"),
        ("card_discard_array", "card_discards"),
    ] {
        let ids = array_as_set(next.get(array_key));
        for (key, value) in pack_set(&ids, category) {
            next.insert(key, value);
        }
    }

    stamp(next, 2)
}

/// v2 → v3: the string-typed protection flag becomes a boolean, and the two
/// obsolete card categories are renamed into `card_faves`/`card_avoids`
/// (merging, since the target may already hold data).
fn step_rename_card_categories(data: Snapshot) -> Snapshot {
    let mut next = data.clone();
    let mut keys_to_remove = Vec::new();

    if let Some(Value::String(flag)) = data.get("block_action") {
        next.insert("block_action".to_string(), Value::Bool(flag == "true"));
    }

    merge_obsolete_category(&data, &mut next, &mut keys_to_remove, "card_protects", "card_faves");
    merge_obsolete_category(&data, &mut next, &mut keys_to_remove, "card_discards", "card_avoids");

    for key in keys_to_remove {
        next.remove(&key);
    }

    stamp(next, 3)
}

/// Rename/merge one obsolete category into its live target.
///
/// Non-empty obsolete index: union its unpacked set into the target (empty
/// set if the target never existed) and re-pack; schedule the obsolete index
/// and every chunk it references for removal. Present-but-empty index: make
/// sure the target index exists without disturbing target data. Absent
/// index: the target is not touched at all — "migrated nothing" and
/// "migrated an empty set" stay distinguishable.
fn merge_obsolete_category(
    data: &Snapshot,
    next: &mut Snapshot,
    keys_to_remove: &mut Vec<String>,
    obsolete: &str,
    target: &str,
) {
    let index_key = format!("{obsolete}_keys");
    let Some(index) = data.get(&index_key) else {
        return;
    };

    let chunk_names: Vec<String> = index
        .as_array()
        .map(|names| {
            names
                .iter()
                .filter_map(|name| name.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    if chunk_names.is_empty() {
        let target_index = format!("{target}_keys");
        if !data.contains_key(&target_index) {
            next.insert(target_index, Value::Array(Vec::new()));
        }
        keys_to_remove.push(index_key);
        return;
    }

    let mut merged = unpack_set(data, target);
    merged.extend(unpack_set(data, obsolete));

    for (key, value) in pack_set(&merged, target) {
        next.insert(key, value);
    }

    keys_to_remove.push(index_key);
    keys_to_remove.extend(chunk_names);
}

/// v3 → v4: the protection boolean becomes the three-valued enum.
fn step_click_protection_enum(data: Snapshot) -> Snapshot {
    let mut next = data;

    let protection = match next.get("block_action") {
        Some(Value::Bool(true)) => "shift",
        _ => "off",
    };
    next.insert(
        "click_protection".to_string(),
        Value::String(protection.to_string()),
    );
    next.remove("block_action");

    stamp(next, STORAGE_SCHEMA_VERSION)
}

fn stamp(mut snapshot: Snapshot, version: u32) -> Snapshot {
    snapshot.insert(SCHEMA_VERSION_KEY.to_string(), Value::from(version));
    snapshot
}

fn array_as_set(value: Option<&Value>) -> BTreeSet<u64> {
    value
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default()
}

/// Migrate a live storage area in place.
///
/// Reads the whole snapshot (read failures propagate — nothing sensible can
/// happen without it), returns immediately with zero writes when the store
/// is already current, and otherwise writes the migrated snapshot followed
/// by a remove of every key the migration dropped. An interruption between
/// the write and the remove leaves extra keys, never missing ones; the
/// cleanup sweep picks those up on a later run.
///
/// An unknown schema version — commonly data synced from a newer release —
/// is logged and answered with a best-effort update check rather than an
/// error: one unmigratable storage area must not take down startup.
pub fn migrate(storage: &dyn StorageArea, notifier: Option<&dyn UpdateNotifier>) -> Result<()> {
    let data = storage.get_all()?;
    let version = detect_version(&data);

    if version == STORAGE_SCHEMA_VERSION {
        return Ok(());
    }

    let migrated = match migrate_data(&data) {
        Ok(migrated) => migrated,
        Err(err) => {
            tracing::error!(%err, "storage migration aborted");

            if let Some(notifier) = notifier {
                if let Err(err) = notifier.request_update_check() {
                    tracing::warn!(%err, "update check request failed");
                }
            }

            return Ok(());
        }
    };

    let keys_to_remove: Vec<String> = data
        .keys()
        .filter(|key| !migrated.contains_key(key.as_str()))
        .cloned()
        .collect();

    storage.set(migrated)?;

    if !keys_to_remove.is_empty() {
        storage.remove(&keys_to_remove)?;
    }

    Ok(())
}
