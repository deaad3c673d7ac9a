//! Storage error types.

use thiserror::Error;

/// Part store operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("part not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
