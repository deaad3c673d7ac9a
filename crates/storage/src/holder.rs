//! Process-wide registry of per-host part store clients.

use crate::error::StorageResult;
use crate::traits::PartStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Constructor for a host's part store client.
pub type StorageFactory = Box<dyn Fn(&str) -> StorageResult<Arc<dyn PartStore>> + Send + Sync>;

/// Lazily creates and caches exactly one part store client per host for the
/// life of the process, so repeated access to a host reuses one handle.
///
/// A single mutex guards the whole registry, including steady-state lookups.
/// Contention is therefore global across hosts, not per host — acceptable at
/// this scale; per-key locking would be the first thing to revisit.
pub struct StorageHolder {
    factory: StorageFactory,
    clients: Mutex<HashMap<String, Arc<dyn PartStore>>>,
}

impl StorageHolder {
    /// Create a holder that builds clients with `factory` on first access.
    pub fn new(factory: StorageFactory) -> Self {
        Self {
            factory,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Get the part store client for `host`, creating it on first access.
    ///
    /// Concurrent first accesses for the same host resolve to a single
    /// client; the registry lock spans the factory call.
    pub fn get(&self, host: &str) -> StorageResult<Arc<dyn PartStore>> {
        let mut clients = self.clients.lock().expect("storage holder lock poisoned");
        if let Some(store) = clients.get(host) {
            return Ok(Arc::clone(store));
        }

        let store = (self.factory)(host)?;
        clients.insert(host.to_string(), Arc::clone(&store));
        Ok(store)
    }

    /// Number of clients created so far.
    pub fn len(&self) -> usize {
        self.clients.lock().expect("storage holder lock poisoned").len()
    }

    /// Whether no client has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
