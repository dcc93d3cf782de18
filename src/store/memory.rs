//! In-memory store
//!
//! BTreeMap-based store with RwLock for concurrency. Each key holds the set
//! of concurrent versions written to it.
//!
//! ## Version Rules
//! - put: rejected with `ObsoleteVersion` if an existing version is equal to
//!   or newer than the incoming clock; versions the incoming clock dominates
//!   are dropped; concurrent versions are kept alongside it.
//! - delete: removes every version equal to or older than the given clock.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::RwLock;

use crate::error::{EmberError, Result};
use crate::versioning::{Occurred, VectorClock, Versioned};

use super::{EntryIter, PartitionStreamable, Partitioner, Store};

pub(super) type VersionMap = BTreeMap<Vec<u8>, Vec<Versioned<Vec<u8>>>>;

/// Versioned key-value store held entirely in memory
pub struct InMemoryStore {
    name: String,

    partitioner: Partitioner,

    /// key → live versions
    pub(super) data: RwLock<VersionMap>,
}

impl InMemoryStore {
    pub fn new(name: impl Into<String>, partitioner: Partitioner) -> Self {
        Self::with_data(name, partitioner, BTreeMap::new())
    }

    pub(super) fn with_data(
        name: impl Into<String>,
        partitioner: Partitioner,
        data: VersionMap,
    ) -> Self {
        Self {
            name: name.into(),
            partitioner,
            data: RwLock::new(data),
        }
    }

    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    /// Number of keys with at least one live version
    pub fn key_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Store for InMemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &[u8]) -> Result<Vec<Versioned<Vec<u8>>>> {
        Ok(self.data.read().get(key).cloned().unwrap_or_default())
    }

    fn put(&self, key: &[u8], value: Versioned<Vec<u8>>) -> Result<()> {
        let mut data = self.data.write();

        if let Some(versions) = data.get_mut(key) {
            let obsolete = versions.iter().find(|existing| {
                matches!(
                    value.version().compare(existing.version()),
                    Occurred::Before | Occurred::Equal
                )
            });
            if let Some(existing) = obsolete {
                return Err(EmberError::ObsoleteVersion(format!(
                    "key '{}': version {:?} is not newer than stored version {:?}",
                    String::from_utf8_lossy(key),
                    value.version().entries(),
                    existing.version().entries()
                )));
            }

            // Keep only versions concurrent with the new one
            versions.retain(|existing| {
                value.version().compare(existing.version()) == Occurred::Concurrently
            });
            versions.push(value);
        } else {
            data.insert(key.to_vec(), vec![value]);
        }

        Ok(())
    }

    fn delete(&self, key: &[u8], version: &VectorClock) -> Result<bool> {
        let mut data = self.data.write();

        let Some(versions) = data.get_mut(key) else {
            return Ok(false);
        };

        let before = versions.len();
        versions.retain(|existing| {
            !matches!(
                existing.version().compare(version),
                Occurred::Before | Occurred::Equal
            )
        });
        let removed = versions.len() < before;

        if versions.is_empty() {
            data.remove(key);
        }

        Ok(removed)
    }
}

impl PartitionStreamable for InMemoryStore {
    fn entries_for(&self, partitions: &[i32]) -> Result<EntryIter<'_>> {
        if let Some(bad) = partitions.iter().find(|p| !self.partitioner.contains(**p)) {
            return Err(EmberError::StoreOperationFailure(format!(
                "partition {} out of range for store '{}' ({} partitions)",
                bad,
                self.name,
                self.partitioner.partition_count()
            )));
        }

        // Snapshot the matching keys; values are read as the iterator advances
        let keys: Vec<Vec<u8>> = self
            .data
            .read()
            .keys()
            .filter(|key| partitions.contains(&self.partitioner.partition_for(key)))
            .cloned()
            .collect();

        tracing::debug!(
            store = %self.name,
            partitions = ?partitions,
            keys = keys.len(),
            "Opened partition iterator"
        );

        Ok(Box::new(PartitionEntries {
            store: self,
            keys: keys.into_iter(),
            pending: VecDeque::new(),
        }))
    }

    /// `value` is a `clock || value` blob, as produced by `entries_for`
    fn ingest(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let versioned = Versioned::from_blob(value)?;
        match self.put(key, versioned) {
            // Already holding this version or a newer one
            Err(EmberError::ObsoleteVersion(msg)) => {
                tracing::trace!(store = %self.name, "Skipped obsolete entry: {}", msg);
                Ok(())
            }
            other => other,
        }
    }
}

/// Lazy iterator over the versions of a fixed key set
struct PartitionEntries<'a> {
    store: &'a InMemoryStore,
    keys: std::vec::IntoIter<Vec<u8>>,

    /// Versions of the current key not yet yielded
    pending: VecDeque<(Vec<u8>, Vec<u8>)>,
}

impl Iterator for PartitionEntries<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Some(Ok(entry));
            }

            let key = self.keys.next()?;
            // Keys deleted since the snapshot simply yield nothing
            let versions = self.store.data.read().get(&key).cloned().unwrap_or_default();
            for versioned in versions {
                self.pending.push_back((key.clone(), versioned.to_blob()));
            }
        }
    }
}
