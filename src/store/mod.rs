//! Store Module
//!
//! The contract the request handler uses to reach a storage backend, the
//! registry that names backends, and an in-memory backend.
//!
//! ## Responsibilities
//! - `Store`: single-key get/put/delete over versioned values
//! - `PartitionStreamable`: optional bulk iteration/ingestion by partition,
//!   used for rebalancing
//! - `StoreRegistry`: immutable name → store map shared by all connections
//!
//! Stores are shared across connection threads and must serialize their own
//! mutations; the handler assumes per-key atomicity.

mod registry;
mod partitioner;
mod memory;
mod snapshot;

pub use registry::{RegisteredStore, StoreRegistry, StoreRegistryBuilder};
pub use partitioner::Partitioner;
pub use memory::InMemoryStore;

use crate::error::Result;
use crate::versioning::{VectorClock, Versioned};

/// Lazy, forward-only sequence of `(key, value)` entries.
///
/// Dropping the iterator releases whatever backend resources it holds.
pub type EntryIter<'a> = Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + Send + 'a>;

/// A keyed, versioned storage backend
pub trait Store: Send + Sync {
    /// Registry name of the store
    fn name(&self) -> &str;

    /// Every live version of `key` (empty if the key is unknown)
    fn get(&self, key: &[u8]) -> Result<Vec<Versioned<Vec<u8>>>>;

    /// Store a new version of `key`
    fn put(&self, key: &[u8], value: Versioned<Vec<u8>>) -> Result<()>;

    /// Remove versions of `key` at or before `version`.
    ///
    /// Returns whether anything was removed.
    fn delete(&self, key: &[u8], version: &VectorClock) -> Result<bool>;
}

/// Bulk transfer of whole partitions
pub trait PartitionStreamable: Store {
    /// Entries whose key falls in one of `partitions`
    fn entries_for(&self, partitions: &[i32]) -> Result<EntryIter<'_>>;

    /// Apply one entry received from another node
    fn ingest(&self, key: &[u8], value: &[u8]) -> Result<()>;
}
