//! Application state shared across handlers.

use granary_core::config::AppConfig;
use granary_metadata::FileMetaStore;
use granary_service::FileService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The file service orchestrating uploads and downloads.
    pub service: Arc<FileService>,
    /// Metadata store handle, kept for health probes.
    pub metadata: Arc<dyn FileMetaStore>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: AppConfig,
        service: Arc<FileService>,
        metadata: Arc<dyn FileMetaStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            service,
            metadata,
        }
    }
}
