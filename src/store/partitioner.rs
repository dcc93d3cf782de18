//! Key partitioning
//!
//! Keys are assigned to partitions by CRC32 of the key bytes. Which node owns
//! which partition is decided elsewhere.

use serde::{Deserialize, Serialize};

use crate::error::{EmberError, Result};

/// Maps keys to partition ids in `0..partition_count`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitioner {
    partition_count: u32,
}

impl Partitioner {
    pub fn new(partition_count: u32) -> Result<Self> {
        if partition_count == 0 || partition_count > i32::MAX as u32 {
            return Err(EmberError::Config(format!(
                "partition count {} out of range",
                partition_count
            )));
        }
        Ok(Self { partition_count })
    }

    pub fn partition_count(&self) -> u32 {
        self.partition_count
    }

    pub fn partition_for(&self, key: &[u8]) -> i32 {
        (crc32fast::hash(key) % self.partition_count) as i32
    }

    pub fn contains(&self, partition: i32) -> bool {
        partition >= 0 && (partition as u32) < self.partition_count
    }
}
