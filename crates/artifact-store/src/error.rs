//! Error types for artifact-store

use thiserror::Error;

/// Errors raised by the artifact, evaluation and job stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record with this id
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Id is malformed or would escape the store directory
    #[error("invalid {kind} id: {id}")]
    InvalidId { kind: &'static str, id: String },

    /// Stored raw text no longer matches its recorded digest
    #[error("digest mismatch for {id}: expected {expected}, found {actual}")]
    DigestMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    /// Record exists but is in the wrong state for the operation
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
    }
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
