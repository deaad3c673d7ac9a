//! Smooth weighted round-robin host selection.

use crate::balancer::{Balancer, BalancerError, BalancerResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

struct WeightedHost {
    host: String,
    weight: i64,
    current: i64,
}

/// Smooth weighted round-robin sequence generator (the nginx algorithm).
///
/// Each draw adds every host's weight to its running score, emits the host
/// with the highest score, and subtracts the total weight from it. Over one
/// period of `total_weight` draws every host appears exactly `weight` times,
/// with repeats spread evenly instead of bursting.
struct SmoothWeighted {
    hosts: Vec<WeightedHost>,
    total_weight: i64,
}

impl SmoothWeighted {
    fn new(weights: &BTreeMap<String, u32>) -> Self {
        let hosts: Vec<WeightedHost> = weights
            .iter()
            .filter(|&(_, &weight)| weight > 0)
            .map(|(host, &weight)| WeightedHost {
                host: host.clone(),
                weight: i64::from(weight),
                current: 0,
            })
            .collect();
        let total_weight = hosts.iter().map(|h| h.weight).sum();
        Self {
            hosts,
            total_weight,
        }
    }

    fn next(&mut self) -> Option<String> {
        if self.hosts.is_empty() {
            return None;
        }

        for host in &mut self.hosts {
            host.current += host.weight;
        }
        let best = self
            .hosts
            .iter_mut()
            .max_by_key(|h| h.current)
            .expect("host list is non-empty");
        best.current -= self.total_weight;
        Some(best.host.clone())
    }
}

/// Weighted round-robin balancer.
///
/// The sequence generator is inherently sequential, so all draws are
/// serialized under one mutex; the critical section is bounded by `count`
/// periods of the generator.
pub struct WeightedRoundRobinBalancer {
    sequence: Mutex<SmoothWeighted>,
    distinct_hosts: usize,
}

impl WeightedRoundRobinBalancer {
    /// Create a balancer over a host-to-weight map.
    ///
    /// Hosts with zero weight are dropped; at least one positive weight is
    /// required.
    pub fn new(weights: &BTreeMap<String, u32>) -> BalancerResult<Self> {
        let sequence = SmoothWeighted::new(weights);
        if sequence.hosts.is_empty() {
            return Err(BalancerError::NoHosts);
        }
        let distinct_hosts = sequence.hosts.len();
        Ok(Self {
            sequence: Mutex::new(sequence),
            distinct_hosts,
        })
    }
}

#[async_trait]
impl Balancer for WeightedRoundRobinBalancer {
    async fn get_hosts(&self, count: usize) -> BalancerResult<Vec<String>> {
        // A file's parts must land on distinct hosts, so the distinct-draw
        // loop below can never satisfy a request for more hosts than carry
        // positive weight. Checked up front instead of looping forever.
        if count > self.distinct_hosts {
            return Err(BalancerError::NotEnoughHosts {
                requested: count,
                available: self.distinct_hosts,
            });
        }

        let mut sequence = self.sequence.lock().expect("balancer lock poisoned");
        let mut hosts = Vec::with_capacity(count);
        let mut seen: HashSet<String> = HashSet::with_capacity(count);

        // One full period visits every positive-weight host at least once,
        // so `count` periods are more than enough draws.
        let max_draws = sequence.total_weight.max(1) as usize * count.max(1);
        for _ in 0..max_draws {
            if hosts.len() == count {
                break;
            }
            let host = sequence.next().ok_or(BalancerError::NoHosts)?;
            if seen.insert(host.clone()) {
                hosts.push(host);
            }
        }

        if hosts.len() != count {
            // Unreachable given the precondition; kept as a hard stop
            // instead of an unbounded loop.
            return Err(BalancerError::NotEnoughHosts {
                requested: count,
                available: seen.len(),
            });
        }
        Ok(hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(h, w)| (h.to_string(), *w)).collect()
    }

    #[test]
    fn smooth_sequence_matches_weights_over_one_period() {
        let mut sequence = SmoothWeighted::new(&weights(&[("a", 5), ("b", 1)]));

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for _ in 0..6 {
            *counts.entry(sequence.next().unwrap()).or_default() += 1;
        }

        assert_eq!(counts["a"], 5);
        assert_eq!(counts["b"], 1);
    }

    #[test]
    fn smooth_sequence_spreads_repeats() {
        // The classic 5/1/1 example: the heavy host never bursts more than
        // twice in a row.
        let mut sequence = SmoothWeighted::new(&weights(&[("a", 5), ("b", 1), ("c", 1)]));

        let drawn: Vec<String> = (0..7).map(|_| sequence.next().unwrap()).collect();
        let max_run = drawn
            .windows(3)
            .filter(|w| w[0] == w[1] && w[1] == w[2])
            .count();
        assert_eq!(max_run, 0, "unexpected burst in {drawn:?}");
    }

    #[tokio::test]
    async fn get_hosts_returns_distinct_hosts() {
        let balancer =
            WeightedRoundRobinBalancer::new(&weights(&[("a", 4), ("b", 2), ("c", 1)])).unwrap();

        for _ in 0..10 {
            let hosts = balancer.get_hosts(3).await.unwrap();
            let distinct: HashSet<_> = hosts.iter().collect();
            assert_eq!(distinct.len(), 3);
        }
    }

    #[tokio::test]
    async fn heavier_hosts_lead_selections_more_often() {
        let balancer = WeightedRoundRobinBalancer::new(&weights(&[("a", 8), ("b", 1)])).unwrap();

        let mut first_counts: BTreeMap<String, usize> = BTreeMap::new();
        for _ in 0..9 {
            let hosts = balancer.get_hosts(1).await.unwrap();
            *first_counts.entry(hosts[0].clone()).or_default() += 1;
        }
        assert_eq!(first_counts["a"], 8);
        assert_eq!(first_counts["b"], 1);
    }

    #[tokio::test]
    async fn requesting_more_hosts_than_weighted_fails_fast() {
        let balancer = WeightedRoundRobinBalancer::new(&weights(&[("a", 1), ("b", 1)])).unwrap();

        match balancer.get_hosts(3).await {
            Err(BalancerError::NotEnoughHosts {
                requested,
                available,
            }) => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn zero_weight_hosts_are_excluded() {
        let balancer = WeightedRoundRobinBalancer::new(&weights(&[("a", 1), ("dead", 0)])).unwrap();
        assert_eq!(balancer.distinct_hosts, 1);

        assert!(matches!(
            WeightedRoundRobinBalancer::new(&weights(&[("dead", 0)])),
            Err(BalancerError::NoHosts)
        ));
    }
}
