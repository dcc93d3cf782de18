//! Versioned values
//!
//! A value tagged with the clock of the write that produced it.

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::VectorClock;

/// An immutable (value, clock) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    value: T,
    version: VectorClock,
}

impl<T> Versioned<T> {
    pub fn new(value: T, version: VectorClock) -> Self {
        Self { value, version }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> &VectorClock {
        &self.version
    }

    pub fn into_parts(self) -> (T, VectorClock) {
        (self.value, self.version)
    }
}

impl Versioned<Vec<u8>> {
    /// Encode as `clockBytes || valueBytes`.
    ///
    /// No separator or inner length is written: the clock's self-declared
    /// size marks where the value starts.
    pub fn to_blob(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(self.version.size_in_bytes() + self.value.len());
        self.version.encode_into(&mut blob);
        blob.extend_from_slice(&self.value);
        blob
    }

    /// Split a `clockBytes || valueBytes` blob
    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let (version, consumed) = VectorClock::from_bytes(blob)?;
        Ok(Self {
            value: blob[consumed..].to_vec(),
            version,
        })
    }
}
