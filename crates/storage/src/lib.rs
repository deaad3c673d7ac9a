//! Part storage abstraction and backends for Granary.
//!
//! This crate provides:
//! - The per-host `PartStore` contract (upload, read, delete a named blob)
//! - Backends: in-memory (testing) and local filesystem
//! - The `StorageHolder` registry caching one client per host

pub mod backends;
pub mod error;
pub mod holder;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, memory::MemoryBackend};
pub use error::{StorageError, StorageResult};
pub use holder::{StorageFactory, StorageHolder};
pub use traits::{ByteStream, PartStore, StreamingUpload};

use granary_core::config::StorageConfig;
use std::sync::Arc;

/// Create a per-host client registry from configuration.
pub fn from_config(config: &StorageConfig) -> StorageResult<StorageHolder> {
    match config {
        StorageConfig::Memory => Ok(StorageHolder::new(Box::new(|_host| {
            Ok(Arc::new(MemoryBackend::new()))
        }))),
        StorageConfig::Filesystem { root } => {
            let root = root.clone();
            Ok(StorageHolder::new(Box::new(move |host| {
                // Host identifiers become directory names under the root.
                backends::validate_path(host)?;
                let backend = FilesystemBackend::new(root.join(host))?;
                Ok(Arc::new(backend))
            })))
        }
    }
}
