//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid split count: {0} (must be at least 1)")]
    InvalidSplitCount(u32),

    #[error("invalid minimum chunk size: {0} (must be at least 1 byte)")]
    InvalidMinChunkSize(u64),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("part lengths sum to {actual}, expected {expected}")]
    PartLengthMismatch { expected: u64, actual: u64 },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
