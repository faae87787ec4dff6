//! Error types for the storage core.

use crate::types::STORAGE_SCHEMA_VERSION;
use thiserror::Error;

/// Main error type for storage and migration operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown data storage schema (got {got}, expected {expected})")]
    UnknownSchema { got: u32, expected: u32 },

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// An unknown or future schema version, compared against the current one.
    pub fn unknown_schema(got: u32) -> Self {
        StoreError::UnknownSchema {
            got,
            expected: STORAGE_SCHEMA_VERSION,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for storage and migration operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Import validation failure. The `Display` strings are surfaced verbatim to
/// the user, so each variant implies a different remediation: re-export the
/// file, update the extension, or discard the file.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ImportError {
    #[error("Invalid file format")]
    InvalidFormat,

    #[error("Not a Fallen London Favourites export file")]
    NotAnExport,

    #[error("This file was created by a newer version. Please update the extension")]
    NewerVersion,

    #[error("File data is corrupted")]
    Corrupted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_messages() {
        assert_eq!(ImportError::InvalidFormat.to_string(), "Invalid file format");
        assert_eq!(
            ImportError::NotAnExport.to_string(),
            "Not a Fallen London Favourites export file"
        );
        assert_eq!(
            ImportError::NewerVersion.to_string(),
            "This file was created by a newer version. Please update the extension"
        );
        assert_eq!(ImportError::Corrupted.to_string(), "File data is corrupted");
    }

    #[test]
    fn test_unknown_schema_mentions_both_versions() {
        let err = StoreError::unknown_schema(9);
        let message = err.to_string();
        assert!(message.contains("got 9"));
        assert!(message.contains("expected 4"));
    }
}
