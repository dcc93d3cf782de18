//! Cluster collaborators
//!
//! Configuration consumed by the node-availability layer: which store handle
//! reaches each node, and how long a failed node stays banned. The request
//! handler never uses this directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::store::Store;

/// A member of the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: u16,
    pub host: String,
    pub socket_port: u16,

    /// Partitions this node currently owns
    pub partitions: Vec<i32>,
}

impl Node {
    pub fn new(id: u16, host: impl Into<String>, socket_port: u16, partitions: Vec<i32>) -> Self {
        Self {
            id,
            host: host.into(),
            socket_port,
            partitions,
        }
    }

    /// `host:port` for the socket protocol
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.socket_port)
    }
}

/// Settings for a node-availability detector
pub trait NodeAvailabilityConfig: Send + Sync {
    /// Name of the detector implementation to use
    fn implementation_name(&self) -> &str;

    /// How long a node is treated as unavailable after a failure
    fn node_bannage_period(&self) -> Duration;

    /// Store handle used to reach `node`
    fn store_for(&self, node: &Node) -> Option<Arc<dyn Store>>;
}

/// Availability config backed by a fixed node → store map
pub struct StaticAvailabilityConfig {
    implementation_name: String,
    bannage_period: Duration,
    stores: HashMap<u16, Arc<dyn Store>>,
}

impl StaticAvailabilityConfig {
    pub fn builder() -> StaticAvailabilityConfigBuilder {
        StaticAvailabilityConfigBuilder::default()
    }
}

impl NodeAvailabilityConfig for StaticAvailabilityConfig {
    fn implementation_name(&self) -> &str {
        &self.implementation_name
    }

    fn node_bannage_period(&self) -> Duration {
        self.bannage_period
    }

    fn store_for(&self, node: &Node) -> Option<Arc<dyn Store>> {
        self.stores.get(&node.id).cloned()
    }
}

/// Builder for StaticAvailabilityConfig
pub struct StaticAvailabilityConfigBuilder {
    implementation_name: String,
    bannage_period: Duration,
    stores: HashMap<u16, Arc<dyn Store>>,
}

impl Default for StaticAvailabilityConfigBuilder {
    fn default() -> Self {
        Self {
            implementation_name: "banned".to_string(),
            bannage_period: Config::default().node_bannage_period(),
            stores: HashMap::new(),
        }
    }
}

impl StaticAvailabilityConfigBuilder {
    /// Take the bannage period from a node config
    pub fn from_config(config: &Config) -> Self {
        Self::default().bannage_period(config.node_bannage_period())
    }

    pub fn implementation_name(mut self, name: impl Into<String>) -> Self {
        self.implementation_name = name.into();
        self
    }

    pub fn bannage_period(mut self, period: Duration) -> Self {
        self.bannage_period = period;
        self
    }

    /// Route requests for `node_id` to `store`
    pub fn node_store(mut self, node_id: u16, store: Arc<dyn Store>) -> Self {
        self.stores.insert(node_id, store);
        self
    }

    pub fn build(self) -> StaticAvailabilityConfig {
        StaticAvailabilityConfig {
            implementation_name: self.implementation_name,
            bannage_period: self.bannage_period,
            stores: self.stores,
        }
    }
}
