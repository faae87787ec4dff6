//! # Favourites Storage Core
//!
//! The storage engine behind a favourites browser extension: a key-value
//! store convention with a versioned, idempotent schema migration pipeline,
//! a chunked set encoding that works around per-key size quotas, a stale-key
//! cleanup sweep, and a versioned import/export format.
//!
//! ## Core Concepts
//!
//! - **Snapshot**: the raw string-to-JSON contents of a storage area
//! - **Categories**: six packed sets of element IDs the user has tagged
//! - **Migration**: pure version-detected step chain from schema v0 to v4
//! - **Cleanup**: best-effort sweep of orphaned chunks and zombie keys
//! - **Export**: a self-describing envelope decoupled from the store layout
//!
//! ## Example
//!
//! ```
//! use favestore::{cleanup, migrate, unpack_set, MemoryStorage, StorageArea};
//! use serde_json::json;
//!
//! // An ancient (v0) store, as left behind by the first release.
//! let storage = MemoryStorage::from_snapshot(
//!     json!({ "branch_faves": [12, 7] }).as_object().unwrap().clone(),
//! );
//!
//! // Startup sequence: migrate, then sweep.
//! migrate(&storage, None).unwrap();
//! cleanup(&storage);
//!
//! let data = storage.get_all().unwrap();
//! assert_eq!(data["storage_schema"], json!(4));
//! assert_eq!(unpack_set(&data, "branch_faves"), [7, 12].into());
//! ```

pub mod chunks;
pub mod cleanup;
pub mod error;
pub mod io;
pub mod migration;
pub mod storage;
pub mod types;
pub mod version;

// Re-exports
pub use chunks::{pack_set, unpack_set};
pub use cleanup::{cleanup, find_orphaned_chunks, find_zombie_keys};
pub use error::{ImportError, Result, StoreError};
pub use io::{export_data, import_data, validate_import, ExportData, ExportFile};
pub use migration::{migrate, migrate_data, UpdateNotifier};
pub use storage::{get_options, set_options, MemoryStorage, StorageArea};
pub use types::*;
pub use version::detect_version;
