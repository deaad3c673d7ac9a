//! Host selection strategies for part placement.

pub mod round_robin;
pub mod weighted;

pub use round_robin::RoundRobinBalancer;
pub use weighted::WeightedRoundRobinBalancer;

use async_trait::async_trait;
use granary_core::config::BalancerConfig;
use std::sync::Arc;
use thiserror::Error;

/// Balancer errors.
#[derive(Debug, Error)]
pub enum BalancerError {
    #[error("no hosts configured")]
    NoHosts,

    #[error("requested {requested} distinct hosts but only {available} are available")]
    NotEnoughHosts { requested: usize, available: usize },
}

/// Result type for balancer operations.
pub type BalancerResult<T> = std::result::Result<T, BalancerError>;

/// Chooses which hosts receive a file's parts.
#[async_trait]
pub trait Balancer: Send + Sync + 'static {
    /// Return `count` host identifiers, in placement order.
    async fn get_hosts(&self, count: usize) -> BalancerResult<Vec<String>>;
}

/// Create a balancer from configuration.
pub fn from_config(config: &BalancerConfig) -> BalancerResult<Arc<dyn Balancer>> {
    match config {
        BalancerConfig::RoundRobin { hosts } => {
            let balancer = RoundRobinBalancer::new(hosts.clone())?;
            Ok(Arc::new(balancer))
        }
        BalancerConfig::Weighted { hosts } => {
            let balancer = WeightedRoundRobinBalancer::new(hosts)?;
            Ok(Arc::new(balancer))
        }
    }
}
