//! Error types for the record store.

use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    #[error("Document is locked by another process")]
    Locked,

    #[error("Document not initialized at {0}")]
    NotInitialized(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
