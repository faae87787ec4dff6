//! Import/export of user data.
//!
//! Exports are a self-describing JSON envelope decoupled from the internal
//! chunked encoding, so a backup survives schema changes the live store
//! goes through. Import accepts any historical export version, and recovers
//! raw storage dumps (a snapshot copied straight out of the store) by
//! running them through the same version detection and migration pipeline
//! the live store uses.

use crate::chunks::{pack_set, unpack_set};
use crate::error::{ImportError, Result, StoreError};
use crate::migration::migrate_data;
use crate::storage::StorageArea;
use crate::types::{
    Options, Snapshot, DATA_KEYS, EXPORT_FORMAT, EXPORT_VERSION, SCHEMA_VERSION_KEY,
    STORAGE_SCHEMA_VERSION,
};
use crate::version::detect_version;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// The six category sets as sorted, deduplicated ID arrays.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportData {
    pub branch_faves: Vec<u64>,
    pub branch_avoids: Vec<u64>,
    pub storylet_faves: Vec<u64>,
    pub storylet_avoids: Vec<u64>,
    pub card_faves: Vec<u64>,
    pub card_avoids: Vec<u64>,
}

impl ExportData {
    /// Unpack all six categories from a raw snapshot.
    pub fn from_snapshot(raw: &Snapshot) -> Self {
        ExportData {
            branch_faves: unpack_sorted(raw, "branch_faves"),
            branch_avoids: unpack_sorted(raw, "branch_avoids"),
            storylet_faves: unpack_sorted(raw, "storylet_faves"),
            storylet_avoids: unpack_sorted(raw, "storylet_avoids"),
            card_faves: unpack_sorted(raw, "card_faves"),
            card_avoids: unpack_sorted(raw, "card_avoids"),
        }
    }

    /// Category name/array pairs, in [`DATA_KEYS`] order.
    pub fn entries(&self) -> [(&'static str, &[u64]); 6] {
        [
            ("branch_faves", &self.branch_faves),
            ("branch_avoids", &self.branch_avoids),
            ("storylet_faves", &self.storylet_faves),
            ("storylet_avoids", &self.storylet_avoids),
            ("card_faves", &self.card_faves),
            ("card_avoids", &self.card_avoids),
        ]
    }
}

/// The external export file envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFile {
    pub format: String,
    pub version: u32,
    pub exported_at: String,
    pub data: ExportData,
    pub options: Options,
}

fn unpack_sorted(raw: &Snapshot, category: &str) -> Vec<u64> {
    // BTreeSet iteration is already ascending.
    unpack_set(raw, category).into_iter().collect()
}

fn export_from_snapshot(raw: &Snapshot, exported_at: String) -> ExportFile {
    ExportFile {
        format: EXPORT_FORMAT.to_string(),
        version: EXPORT_VERSION,
        exported_at,
        data: ExportData::from_snapshot(raw),
        options: Options::from_raw(raw),
    }
}

/// Build an export file from the live store.
pub fn export_data(storage: &dyn StorageArea) -> Result<ExportFile> {
    let raw = storage.get_all()?;
    let exported_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    Ok(export_from_snapshot(&raw, exported_at))
}

/// Validate arbitrary untyped input as an export file.
///
/// Accepts three shapes: a native export at any version up to the current
/// one, an object carrying the wrong format marker (rejected by name), and
/// an object with no marker at all, which is treated as a raw storage dump
/// and pushed through version detection plus the full migration chain. The
/// returned file is normalized to the current envelope either way.
pub fn validate_import(raw: &Value) -> std::result::Result<ExportFile, ImportError> {
    let Some(object) = raw.as_object() else {
        return Err(ImportError::InvalidFormat);
    };

    match object.get("format") {
        Some(format) if *format == Value::from(EXPORT_FORMAT) => validate_native(object),
        Some(_) => Err(ImportError::NotAnExport),
        None => validate_raw_dump(object),
    }
}

fn validate_native(object: &Snapshot) -> std::result::Result<ExportFile, ImportError> {
    let Some(version) = object.get("version").and_then(Value::as_u64) else {
        return Err(ImportError::InvalidFormat);
    };

    if version > u64::from(EXPORT_VERSION) {
        return Err(ImportError::NewerVersion);
    }

    let Some(data) = object.get("data").and_then(Value::as_object) else {
        return Err(ImportError::Corrupted);
    };

    let mut categories = Snapshot::new();
    for key in DATA_KEYS {
        let Some(Value::Array(values)) = data.get(key) else {
            return Err(ImportError::Corrupted);
        };

        let mut ids = Vec::with_capacity(values.len());
        for value in values {
            let Some(id) = value.as_u64() else {
                return Err(ImportError::Corrupted);
            };
            ids.push(id);
        }

        categories.insert(key.to_string(), Value::from(ids));
    }

    let options_raw = object
        .get("options")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let exported_at = object
        .get("exported_at")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(ExportFile {
        format: EXPORT_FORMAT.to_string(),
        version: version as u32,
        exported_at,
        data: serde_json::from_value(Value::Object(categories))
            .map_err(|_| ImportError::Corrupted)?,
        options: Options::from_raw(&options_raw),
    })
}

/// Recover an export from a raw storage dump by detecting its version and
/// migrating it to the current schema.
fn validate_raw_dump(object: &Snapshot) -> std::result::Result<ExportFile, ImportError> {
    let version = detect_version(object);
    let has_packed_data = object.keys().any(|key| key.ends_with("_keys"));

    // "Current version" with no packed data anywhere means detection fell
    // through to its fresh-install default: nothing recognizable.
    if version >= STORAGE_SCHEMA_VERSION && !has_packed_data {
        return Err(ImportError::NotAnExport);
    }

    if version > STORAGE_SCHEMA_VERSION {
        return Err(ImportError::NewerVersion);
    }

    let migrated = migrate_data(object).map_err(|err| match err {
        StoreError::UnknownSchema { .. } => ImportError::NewerVersion,
        _ => ImportError::Corrupted,
    })?;

    let exported_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    Ok(export_from_snapshot(&migrated, exported_at))
}

/// Replace the live store with the contents of a validated export file.
///
/// Clears first, then writes the version marker, the options, and the
/// packed encoding of all six categories in one batch — no orphan or zombie
/// key can survive an import.
pub fn import_data(storage: &dyn StorageArea, file: &ExportFile) -> Result<()> {
    let mut entries = Snapshot::new();
    entries.insert(
        SCHEMA_VERSION_KEY.to_string(),
        Value::from(STORAGE_SCHEMA_VERSION),
    );
    entries.append(&mut file.options.to_entries());

    for (category, ids) in file.data.entries() {
        let set: BTreeSet<u64> = ids.iter().copied().collect();
        entries.append(&mut pack_set(&set, category));
    }

    storage.clear()?;
    storage.set(entries)?;

    Ok(())
}
