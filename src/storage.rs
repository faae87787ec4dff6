//! The storage area contract and an in-process implementation.
//!
//! Every component in this crate talks to storage through [`StorageArea`],
//! mirroring the extension storage API it abstracts: an enumerable string
//! key space holding JSON values, with merge-style writes. Change
//! notification is deliberately absent — only the sync scheduler outside
//! this core consumes it.

use crate::error::Result;
use crate::types::{Options, Snapshot};
use parking_lot::Mutex;
use serde_json::Value;

/// A key-value storage area.
///
/// `remove` of an absent key is a no-op, never an error. The two narrower
/// read forms are derived from [`StorageArea::get_all`] by default;
/// implementations backed by a remote store may override them to fetch less.
pub trait StorageArea {
    /// All entries currently in the store.
    fn get_all(&self) -> Result<Snapshot>;

    /// Merge the given entries into the store (upsert).
    fn set(&self, entries: Snapshot) -> Result<()>;

    /// Delete the given keys where present.
    fn remove(&self, keys: &[String]) -> Result<()>;

    /// Delete every key.
    fn clear(&self) -> Result<()>;

    /// The subset of entries whose keys are listed.
    fn get_keys(&self, keys: &[&str]) -> Result<Snapshot> {
        let all = self.get_all()?;
        Ok(keys
            .iter()
            .filter_map(|&key| all.get(key).map(|value| (key.to_string(), value.clone())))
            .collect())
    }

    /// Every named key with its stored value, or the supplied default when
    /// the key is absent.
    fn get_with_defaults(&self, defaults: &Snapshot) -> Result<Snapshot> {
        let all = self.get_all()?;
        Ok(defaults
            .iter()
            .map(|(key, default)| {
                let value = all.get(key).unwrap_or(default).clone();
                (key.clone(), value)
            })
            .collect())
    }
}

/// In-memory storage area.
///
/// Backs the test suites and embedders hosting the core outside a browser.
/// Interior mutability keeps the trait methods `&self`, matching how a real
/// storage handle is shared.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<Snapshot>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A storage area pre-populated with the given snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            entries: Mutex::new(snapshot),
        }
    }

    /// A copy of the current contents, for assertions and dumps.
    pub fn snapshot(&self) -> Snapshot {
        self.entries.lock().clone()
    }
}

impl StorageArea for MemoryStorage {
    fn get_all(&self) -> Result<Snapshot> {
        Ok(self.entries.lock().clone())
    }

    fn set(&self, entries: Snapshot) -> Result<()> {
        let mut guard = self.entries.lock();
        for (key, value) in entries {
            guard.insert(key, value);
        }
        Ok(())
    }

    fn remove(&self, keys: &[String]) -> Result<()> {
        let mut guard = self.entries.lock();
        for key in keys {
            guard.remove(key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// Read the options record, sanitized against defaults.
pub fn get_options(storage: &dyn StorageArea) -> Result<Options> {
    let raw = storage.get_all()?;
    Ok(Options::from_raw(&raw))
}

/// Write the options record.
pub fn set_options(storage: &dyn StorageArea, options: &Options) -> Result<()> {
    storage.set(options.to_entries())
}

/// Read a single key, falling back to the given default when absent.
pub fn get_or_default(storage: &dyn StorageArea, key: &str, default: Value) -> Result<Value> {
    let mut defaults = Snapshot::new();
    defaults.insert(key.to_string(), default);
    let mut found = storage.get_with_defaults(&defaults)?;
    Ok(found.remove(key).unwrap_or(Value::Null))
}
