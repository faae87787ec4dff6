//! Core types and storage constants.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current storage schema version. Versions 0 and 1 predate the explicit
/// marker and are inferred from data shape (see [`crate::version`]).
pub const STORAGE_SCHEMA_VERSION: u32 = 4;

/// Reserved key holding the schema version marker (v2+ only).
pub const SCHEMA_VERSION_KEY: &str = "storage_schema";

/// Maximum number of integers stored under a single chunk key. Works around
/// the per-key size quota of the underlying storage engine.
pub const MAX_PACK_ITEMS_PER_KEY: usize = 512;

/// Format marker written into every export file.
pub const EXPORT_FORMAT: &str = "fallen-london-favourites";

/// Current export file version.
pub const EXPORT_VERSION: u32 = 2;

/// The six live category names, each denoting a packed set of element IDs.
pub const DATA_KEYS: [&str; 6] = [
    "branch_faves",
    "branch_avoids",
    "storylet_faves",
    "storylet_avoids",
    "card_faves",
    "card_avoids",
];

/// Categories retired in v3 (renamed into `card_faves`/`card_avoids`).
/// Their chunk keys may still linger after an incomplete merge.
pub const OBSOLETE_DATA_KEYS: [&str; 2] = ["card_protects", "card_discards"];

/// Raw contents of a storage area: string keys to JSON values. The map is
/// BTree-backed, so iteration and serialization order are deterministic.
pub type Snapshot = serde_json::Map<String, Value>;

/// Branch reorder behaviour on the story page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchReorderMode {
    #[serde(rename = "branch_no_reorder")]
    NoReorder,
    #[serde(rename = "branch_reorder_active")]
    ReorderActive,
    #[serde(rename = "branch_reorder_all")]
    ReorderAll,
}

impl Default for BranchReorderMode {
    fn default() -> Self {
        BranchReorderMode::ReorderActive
    }
}

/// How a tagged element reacts to a plain click.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchMode {
    ClickThrough,
    ModifierClick,
}

impl Default for SwitchMode {
    fn default() -> Self {
        SwitchMode::ClickThrough
    }
}

/// Click protection for avoided elements. Introduced in schema v4,
/// replacing the `block_action` boolean of v3 (and its string form in v2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickProtection {
    Off,
    Shift,
    Confirm,
}

impl Default for ClickProtection {
    fn default() -> Self {
        ClickProtection::Off
    }
}

/// The three user-facing settings, each with a documented default applied
/// whenever the stored value is absent or invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Options {
    pub branch_reorder_mode: BranchReorderMode,
    pub switch_mode: SwitchMode,
    pub click_protection: ClickProtection,
}

impl Options {
    /// Sanitize options field-by-field from a raw snapshot, falling back to
    /// defaults for absent or invalid values.
    ///
    /// Backward compatibility: data written before v4 carries a boolean
    /// `block_action` instead of `click_protection`. When the new field is
    /// absent the boolean is translated (`true` → shift, `false` → off)
    /// rather than discarded.
    pub fn from_raw(raw: &Snapshot) -> Self {
        let branch_reorder_mode = parse_enum(raw.get("branch_reorder_mode")).unwrap_or_default();
        let switch_mode = parse_enum(raw.get("switch_mode")).unwrap_or_default();

        let click_protection = match raw.get("click_protection") {
            Some(value) => parse_enum(Some(value)).unwrap_or_default(),
            None => match raw.get("block_action").and_then(Value::as_bool) {
                Some(true) => ClickProtection::Shift,
                _ => ClickProtection::Off,
            },
        };

        Options {
            branch_reorder_mode,
            switch_mode,
            click_protection,
        }
    }

    /// The three option entries as storage key/value pairs.
    pub fn to_entries(&self) -> Snapshot {
        let mut entries = Snapshot::new();
        entries.insert(
            "branch_reorder_mode".to_string(),
            serde_json::to_value(self.branch_reorder_mode).unwrap_or(Value::Null),
        );
        entries.insert(
            "switch_mode".to_string(),
            serde_json::to_value(self.switch_mode).unwrap_or(Value::Null),
        );
        entries.insert(
            "click_protection".to_string(),
            serde_json::to_value(self.click_protection).unwrap_or(Value::Null),
        );
        entries
    }
}

fn parse_enum<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Option<T> {
    value.and_then(|v| serde_json::from_value(v.clone()).ok())
}
