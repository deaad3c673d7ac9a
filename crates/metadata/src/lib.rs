//! Metadata store abstraction and implementations for Granary.
//!
//! This crate persists the mapping from a file name to its ordered list of
//! parts, through the two-phase processing -> committed lifecycle that makes
//! uploads crash-detectable: readers only ever see fully-written files.

pub mod error;
pub mod models;
pub mod postgres;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use postgres::PostgresStore;
pub use store::{FileMetaStore, SqliteStore};

use granary_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn FileMetaStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn FileMetaStore>)
        }
        MetadataConfig::Postgres {
            url,
            max_connections,
        } => {
            tracing::info!("Connecting to PostgreSQL metadata store");
            let store = PostgresStore::from_url(url, *max_connections).await?;
            Ok(Arc::new(store) as Arc<dyn FileMetaStore>)
        }
    }
}
