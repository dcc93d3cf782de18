//! Store registry
//!
//! Name → store map, built once at startup and then only read. Whether a
//! store can stream partitions is decided here, at registration, so request
//! handling never has to probe a store's type.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EmberError, Result};

use super::{PartitionStreamable, Store};

/// A store plus its optional streaming capability
#[derive(Clone)]
pub struct RegisteredStore {
    store: Arc<dyn Store>,
    streamable: Option<Arc<dyn PartitionStreamable>>,
}

impl RegisteredStore {
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The streaming view, if the store supports it
    pub fn streamable(&self) -> Option<&Arc<dyn PartitionStreamable>> {
        self.streamable.as_ref()
    }

    pub fn name(&self) -> &str {
        self.store.name()
    }
}

/// Immutable registry of the node's stores
pub struct StoreRegistry {
    stores: HashMap<String, RegisteredStore>,
}

impl StoreRegistry {
    pub fn builder() -> StoreRegistryBuilder {
        StoreRegistryBuilder::default()
    }

    /// Look up a store by name
    pub fn get(&self, name: &str) -> Option<&RegisteredStore> {
        self.stores.get(name)
    }

    /// Registered store names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

/// Builder for StoreRegistry
#[derive(Default)]
pub struct StoreRegistryBuilder {
    entries: Vec<RegisteredStore>,
}

impl StoreRegistryBuilder {
    /// Register a store without streaming support
    pub fn register<S: Store + 'static>(mut self, store: Arc<S>) -> Self {
        self.entries.push(RegisteredStore {
            store,
            streamable: None,
        });
        self
    }

    /// Register a store that can also stream partitions
    pub fn register_streamable<S: PartitionStreamable + 'static>(mut self, store: Arc<S>) -> Self {
        let streamable: Arc<dyn PartitionStreamable> = store.clone();
        self.entries.push(RegisteredStore {
            store,
            streamable: Some(streamable),
        });
        self
    }

    /// Build the registry, rejecting duplicate names
    pub fn build(self) -> Result<StoreRegistry> {
        let mut stores = HashMap::with_capacity(self.entries.len());
        for entry in self.entries {
            let name = entry.name().to_string();
            if stores.contains_key(&name) {
                return Err(EmberError::Config(format!(
                    "store '{}' registered more than once",
                    name
                )));
            }
            tracing::debug!(
                store = %name,
                streamable = entry.streamable.is_some(),
                "Registered store"
            );
            stores.insert(name, entry);
        }
        Ok(StoreRegistry { stores })
    }
}
