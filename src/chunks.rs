//! Chunked set codec.
//!
//! The underlying storage engine caps the size of any single entry, so a
//! category's ID set is split across bounded chunk keys (`<category>_0`,
//! `<category>_1`, …) plus an index key (`<category>_keys`) listing the
//! chunk names that are currently valid. The index is authoritative: chunk
//! keys it does not reference are garbage (see [`crate::cleanup`]).

use crate::types::{Snapshot, MAX_PACK_ITEMS_PER_KEY};
use serde_json::Value;
use std::collections::BTreeSet;

/// Pack a set of IDs into chunk entries plus the index entry.
///
/// IDs are stored in ascending order and sliced into consecutive chunks of
/// at most [`MAX_PACK_ITEMS_PER_KEY`] elements, so the same set always
/// produces the same chunk boundaries. An empty set yields only an empty
/// index.
pub fn pack_set(set: &BTreeSet<u64>, category: &str) -> Snapshot {
    let source: Vec<u64> = set.iter().copied().collect();
    let mut keys = Vec::new();
    let mut result = Snapshot::new();

    for (index, chunk) in source.chunks(MAX_PACK_ITEMS_PER_KEY).enumerate() {
        let chunk_key = format!("{category}_{index}");
        result.insert(
            chunk_key.clone(),
            Value::Array(chunk.iter().map(|&id| Value::from(id)).collect()),
        );
        keys.push(Value::String(chunk_key));
    }

    result.insert(format!("{category}_keys"), Value::Array(keys));

    result
}

/// Reassemble a category's set from a snapshot.
///
/// A missing or non-array index yields the empty set. Chunks that are
/// missing, not arrays, or contain non-integer elements contribute nothing;
/// partial corruption never fails the whole read.
pub fn unpack_set(data: &Snapshot, category: &str) -> BTreeSet<u64> {
    let mut result = BTreeSet::new();

    let Some(Value::Array(keys)) = data.get(&format!("{category}_keys")) else {
        return result;
    };

    for key in keys {
        let Some(name) = key.as_str() else { continue };

        if let Some(Value::Array(values)) = data.get(name) {
            result.extend(values.iter().filter_map(Value::as_u64));
        }
    }

    result
}
