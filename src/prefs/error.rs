//! Error types for the preference store.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Preference store error type.
#[derive(Debug, Error)]
pub enum PrefsError {
    /// Failed to create the preference directory.
    #[error("Failed to create preference directory {path:?}: {source}")]
    DirectoryCreation {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to read a preference file.
    #[error("Failed to read preference {key}: {source}")]
    Read {
        /// Preference key
        key: &'static str,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to write a preference file.
    #[error("Failed to write preference {key}: {source}")]
    Write {
        /// Preference key
        key: &'static str,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to serialize a preference value.
    #[error("Failed to serialize preference {key}: {source}")]
    Serialize {
        /// Preference key
        key: &'static str,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for preference operations.
pub type Result<T> = std::result::Result<T, PrefsError>;
