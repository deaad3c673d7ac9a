//! Lock-free round-robin host selection.

use crate::balancer::{Balancer, BalancerError, BalancerResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Round-robin over a fixed host list.
///
/// A single monotonically increasing cursor is shared across all calls; each
/// call atomically advances it by `count` and takes the `count` consecutive
/// positions it reserved, index-wrapped over the host list. Concurrent calls
/// therefore never receive overlapping cursor windows. When `count` exceeds
/// the number of hosts the window necessarily contains repeats; that is the
/// documented behavior, not an error.
pub struct RoundRobinBalancer {
    hosts: Vec<String>,
    cursor: AtomicU64,
}

impl RoundRobinBalancer {
    /// Create a balancer over `hosts`.
    pub fn new(hosts: Vec<String>) -> BalancerResult<Self> {
        if hosts.is_empty() {
            return Err(BalancerError::NoHosts);
        }
        Ok(Self {
            hosts,
            cursor: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl Balancer for RoundRobinBalancer {
    async fn get_hosts(&self, count: usize) -> BalancerResult<Vec<String>> {
        let start = self.cursor.fetch_add(count as u64, Ordering::Relaxed);
        let len = self.hosts.len() as u64;

        Ok((0..count as u64)
            .map(|i| self.hosts[(start.wrapping_add(i) % len) as usize].clone())
            .collect())
    }
}
