//! Configuration for EmberKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{EmberError, Result};

/// Maximum length accepted for any length-prefixed field (16 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Main configuration for an EmberKV storage node
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Upper bound for any declared length on the wire (bytes)
    pub max_frame_size: usize,

    // -------------------------------------------------------------------------
    // Cluster Configuration
    // -------------------------------------------------------------------------
    /// Identifier of this node, used when advancing vector clocks
    pub node_id: u16,

    /// Number of partitions the key space is split into
    pub partition_count: u32,

    /// How long a node is considered unavailable after a failure (milliseconds)
    pub node_bannage_period_ms: u64,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding store snapshots, if persistence is enabled
    ///   {snapshot_dir}/
    ///     └── {store_name}.snapshot
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:6666".to_string(),
            max_connections: 1024,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            node_id: 0,
            partition_count: 32,
            node_bannage_period_ms: 30_000,
            snapshot_dir: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the settings that would make the node unusable
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(EmberError::Config("max_connections must be > 0".to_string()));
        }
        if self.partition_count == 0 {
            return Err(EmberError::Config("partition_count must be > 0".to_string()));
        }
        if self.max_frame_size == 0 || self.max_frame_size > i32::MAX as usize {
            return Err(EmberError::Config(format!(
                "max_frame_size must be in 1..={}",
                i32::MAX
            )));
        }
        Ok(())
    }

    /// Bannage period as a `Duration`
    pub fn node_bannage_period(&self) -> Duration {
        Duration::from_millis(self.node_bannage_period_ms)
    }

    /// Path of the snapshot file for `store_name`, if snapshots are enabled
    pub fn snapshot_path(&self, store_name: &str) -> Option<PathBuf> {
        self.snapshot_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.snapshot", store_name)))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the largest accepted length-prefixed field (in bytes)
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set this node's identifier
    pub fn node_id(mut self, id: u16) -> Self {
        self.config.node_id = id;
        self
    }

    /// Set the number of partitions
    pub fn partition_count(mut self, count: u32) -> Self {
        self.config.partition_count = count;
        self
    }

    /// Set the node bannage period (in milliseconds)
    pub fn node_bannage_period_ms(mut self, ms: u64) -> Self {
        self.config.node_bannage_period_ms = ms;
        self
    }

    /// Enable snapshots in the given directory
    pub fn snapshot_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_dir = Some(path.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
