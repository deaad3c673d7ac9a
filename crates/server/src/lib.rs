//! HTTP frontend for Granary.
//!
//! Thin glue between the transport and the file service: two file routes,
//! a health probe, and the wiring that turns configuration into a running
//! component graph.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

use anyhow::{Context, Result};
use granary_core::config::AppConfig;
use granary_service::FileService;
use std::sync::Arc;

/// Build the application state from configuration: storage holder,
/// metadata store (migrated), balancer, and the file service.
pub async fn build_state(config: AppConfig) -> Result<AppState> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    let storages = Arc::new(
        granary_storage::from_config(&config.storage).context("failed to initialize storage")?,
    );

    let metadata = granary_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata store health check failed")?;

    let balancer = granary_service::balancer::from_config(&config.balancer)
        .context("failed to initialize balancer")?;

    let service = Arc::new(FileService::new(
        balancer,
        storages,
        Arc::clone(&metadata),
        &config.service,
    ));

    Ok(AppState::new(config, service, metadata))
}
