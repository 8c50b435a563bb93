//! Error types for fieldsync-core

use thiserror::Error;

/// Result type alias using fieldsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fieldsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local persistence driver failure
    #[error("Storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Local persistence unusable (poisoned lock, unopenable backend)
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error originates from the local persistence layer.
    pub const fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::StorageUnavailable(_))
    }
}
