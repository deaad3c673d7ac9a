//! File service error types.

use crate::balancer::BalancerError;
use granary_metadata::MetadataError;
use granary_storage::StorageError;
use thiserror::Error;

/// File service operation errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("request body ended after {received} of {expected} bytes")]
    BodyLength { expected: u64, received: u64 },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("balancer error: {0}")]
    Balancer(#[from] BalancerError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("metadata error: {0}")]
    Metadata(MetadataError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MetadataError> for ServiceError {
    fn from(err: MetadataError) -> Self {
        // NotFound and AlreadyExists keep their kind across the boundary so
        // callers can map them without digging through layers.
        match err {
            MetadataError::NotFound(name) => Self::NotFound(name),
            MetadataError::AlreadyExists(name) => Self::AlreadyExists(name),
            other => Self::Metadata(other),
        }
    }
}

impl From<granary_core::Error> for ServiceError {
    fn from(err: granary_core::Error) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type for file service operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
