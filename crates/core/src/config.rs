//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Get the shutdown timeout as a Duration.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// File service configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Minimum part size in bytes.
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: u64,
    /// Number of hosts a file is split across.
    #[serde(default = "default_split_count")]
    pub split_count: u32,
}

fn default_min_chunk_size() -> u64 {
    crate::DEFAULT_MIN_CHUNK_SIZE
}

fn default_split_count() -> u32 {
    crate::DEFAULT_SPLIT_COUNT
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: default_min_chunk_size(),
            split_count: default_split_count(),
        }
    }
}

impl ServiceConfig {
    /// Validate service configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.split_count == 0 {
            return Err("service.split_count must be at least 1".to_string());
        }
        if self.min_chunk_size == 0 {
            return Err("service.min_chunk_size must be at least 1 byte".to_string());
        }
        Ok(())
    }
}

/// Host selection strategy configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum BalancerConfig {
    /// Round-robin over a fixed host list.
    RoundRobin {
        /// Backend host identifiers.
        hosts: Vec<String>,
    },
    /// Smooth weighted round-robin over a host-to-weight map.
    Weighted {
        /// Backend host identifiers mapped to integer weights.
        hosts: BTreeMap<String, u32>,
    },
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self::RoundRobin { hosts: Vec::new() }
    }
}

impl BalancerConfig {
    /// Number of distinct hosts the strategy can ever return.
    ///
    /// For the weighted strategy only hosts with a positive weight count:
    /// zero-weight hosts are never emitted by the sequence generator.
    pub fn distinct_host_count(&self) -> usize {
        match self {
            Self::RoundRobin { hosts } => hosts.len(),
            Self::Weighted { hosts } => hosts.values().filter(|&&w| w > 0).count(),
        }
    }

    /// Validate balancer configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::RoundRobin { hosts } => {
                if hosts.is_empty() {
                    return Err("balancer.hosts must not be empty".to_string());
                }
                let mut seen = std::collections::HashSet::new();
                for host in hosts {
                    if !seen.insert(host) {
                        return Err(format!("balancer.hosts contains duplicate host: {host}"));
                    }
                }
                Ok(())
            }
            Self::Weighted { hosts } => {
                if hosts.values().all(|&w| w == 0) {
                    return Err(
                        "balancer.hosts must contain at least one host with positive weight"
                            .to_string(),
                    );
                }
                Ok(())
            }
        }
    }
}

/// Part store backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (testing only; contents die with the process).
    Memory,
    /// Local filesystem storage, one subdirectory per host.
    Filesystem {
        /// Root directory for all hosts' blobs.
        root: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            root: PathBuf::from("./data/parts"),
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (recommended for testing and small deployments).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL.
        url: String,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_max_connections() -> u32 {
    10
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// File service configuration.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Host selection configuration.
    #[serde(default)]
    pub balancer: BalancerConfig,
    /// Part store backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Validate the whole configuration.
    ///
    /// Beyond the per-section checks, the split count must not exceed the
    /// number of distinct hosts: a file's parts must land on distinct
    /// hosts, and the weighted strategy cannot satisfy a request for more
    /// hosts than carry positive weight.
    pub fn validate(&self) -> Result<(), String> {
        self.service.validate()?;
        self.balancer.validate()?;

        let distinct = self.balancer.distinct_host_count();
        if self.service.split_count as usize > distinct {
            return Err(format!(
                "service.split_count {} exceeds the {} distinct configured hosts",
                self.service.split_count, distinct
            ));
        }
        Ok(())
    }

    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses in-memory part storage and three
    /// round-robin hosts.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            service: ServiceConfig {
                min_chunk_size: 4,
                split_count: 3,
            },
            balancer: BalancerConfig::RoundRobin {
                hosts: vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
            },
            storage: StorageConfig::Memory,
            metadata: MetadataConfig::default(),
        }
    }
}
