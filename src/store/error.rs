//! Error types for the document store

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by a catalog or progress store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or could not serve the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing the snapshot file failed
    #[error("Snapshot I/O failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file exists but does not parse
    #[error("Corrupt snapshot {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
