//! Stale-key cleanup.
//!
//! Two kinds of garbage accumulate in a store: orphaned chunks (written by
//! a partial update, then dropped from their category's index) and zombie
//! keys (retired by a schema migration, then reintroduced by merge-based
//! multi-device sync). Both are detected by pure functions and removed by a
//! single best-effort sweep, independent of the migration version chain.

use crate::storage::StorageArea;
use crate::types::{Snapshot, DATA_KEYS, OBSOLETE_DATA_KEYS};
use serde_json::Value;
use std::collections::BTreeSet;

/// Keys retired by past schema versions. Their presence in a migrated store
/// means a cleanup never finished; they must not survive a sweep.
const ZOMBIE_KEYS: [&str; 8] = [
    "block_action",
    "branch_fave_array",
    "branch_faves",
    "storylet_fave_array",
    "card_protect_array",
    "card_discard_array",
    "card_protects_keys",
    "card_discards_keys",
];

/// Find `<category>_<n>` chunk keys not referenced by their category index.
///
/// Scans the two obsolete categories as well, to catch stragglers from an
/// interrupted v2→v3 merge. A missing or non-array index validates nothing,
/// so every chunk of that category is an orphan.
pub fn find_orphaned_chunks(data: &Snapshot) -> Vec<String> {
    let mut orphans = Vec::new();

    for category in DATA_KEYS.iter().chain(OBSOLETE_DATA_KEYS.iter()) {
        let valid: BTreeSet<&str> = data
            .get(&format!("{category}_keys"))
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        for key in data.keys() {
            if is_chunk_key(key, category) && !valid.contains(key.as_str()) {
                orphans.push(key.clone());
            }
        }
    }

    orphans
}

/// Whether `key` has the shape `<category>_<digits>`.
fn is_chunk_key(key: &str, category: &str) -> bool {
    key.strip_prefix(category)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
}

/// Find keys from the fixed zombie list that are present in the snapshot.
pub fn find_zombie_keys(data: &Snapshot) -> Vec<String> {
    ZOMBIE_KEYS
        .iter()
        .filter(|key| data.contains_key(**key))
        .map(|key| key.to_string())
        .collect()
}

/// Remove orphaned chunks and zombie keys from a storage area.
///
/// Issues a single remove, and only when there is something to remove —
/// clean storage is left byte-for-byte untouched. Housekeeping is never a
/// precondition for anything else, so I/O failures are logged and swallowed
/// here rather than propagated.
pub fn cleanup(storage: &dyn StorageArea) {
    let data = match storage.get_all() {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(%err, "cleanup sweep could not read storage");
            return;
        }
    };

    let mut keys_to_remove = find_orphaned_chunks(&data);
    keys_to_remove.extend(find_zombie_keys(&data));

    if keys_to_remove.is_empty() {
        return;
    }

    if let Err(err) = storage.remove(&keys_to_remove) {
        tracing::warn!(%err, "cleanup sweep could not remove stale keys");
    }
}
