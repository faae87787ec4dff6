//! Schema version detection.

use crate::types::{Snapshot, SCHEMA_VERSION_KEY, STORAGE_SCHEMA_VERSION};
use serde_json::Value;

/// Detect the schema version of a raw snapshot.
///
/// Only v2+ snapshots carry an explicit marker; earlier releases never wrote
/// one, so the version must be inferred from data shape. The heuristics are
/// ordered, first match wins:
///
/// 1. Numeric value under the reserved marker key → returned verbatim, even
///    if it exceeds the current version (the caller decides how to handle a
///    future schema; it is never clamped here).
/// 2. `branch_fave_array` present (the array key used only by v1) → 1.
/// 3. `branch_faves` present as a plain array (before the v1 rename) → 0.
/// 4. Any key ending in `_keys` → 2 (the packed-set format shipped by the
///    legacy release that predates the marker).
/// 5. Nothing recognizable, including an empty snapshot → current version
///    (fresh install, nothing to migrate).
pub fn detect_version(raw: &Snapshot) -> u32 {
    if let Some(version) = raw.get(SCHEMA_VERSION_KEY).and_then(Value::as_u64) {
        // Saturate rather than wrap: an absurdly large marker must still
        // read as a future version upstream.
        return u32::try_from(version).unwrap_or(u32::MAX);
    }

    if raw.contains_key("branch_fave_array") {
        return 1;
    }

    if raw.get("branch_faves").is_some_and(Value::is_array) {
        return 0;
    }

    if raw.keys().any(|key| key.ends_with("_keys")) {
        return 2;
    }

    STORAGE_SCHEMA_VERSION
}
