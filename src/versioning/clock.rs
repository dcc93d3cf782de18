//! Vector clock
//!
//! A vector clock maps node ids to counters and carries the wall-clock time of
//! the write that produced it. Clocks are never mutated in place once handed
//! out: every write derives a new clock with [`VectorClock::incremented`].
//!
//! ## Wire Format
//! ```text
//! ┌─────────────┬──────────────┬────────────────────────────────┬───────────────┐
//! │ Entries (2) │ VersionSz (1)│ Entries × (Node (2) + Counter) │ Timestamp (8) │
//! └─────────────┴──────────────┴────────────────────────────────┴───────────────┘
//! ```
//! `VersionSz` is the width in bytes (1..=8) of every counter. The format
//! declares its own length, so a clock can prefix a value without an extra
//! length field.

use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{EmberError, Result};

/// Fixed header: entry count (2) + version size (1)
pub const CLOCK_HEADER_SIZE: usize = 3;

/// Trailing timestamp (8)
pub const CLOCK_TIMESTAMP_SIZE: usize = 8;

const NODE_ID_SIZE: usize = 2;
const MAX_VERSION_SIZE: usize = 8;

/// The entry count is encoded as a u16
pub const MAX_CLOCK_ENTRIES: usize = u16::MAX as usize;

/// Causal relationship between two clocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurred {
    /// The first clock happened before the second
    Before,

    /// The first clock happened after the second
    After,

    /// Neither clock dominates: a conflict
    Concurrently,

    /// Same counter for every node
    Equal,
}

/// One node's counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClockEntry {
    pub node_id: u16,
    pub version: u64,
}

impl ClockEntry {
    pub fn new(node_id: u16, version: u64) -> Self {
        Self { node_id, version }
    }
}

/// An immutable causal version stamp
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorClock {
    /// Sorted by node id, one entry per node
    entries: Vec<ClockEntry>,

    /// Unix millis of the write that produced this clock
    timestamp: i64,
}

impl VectorClock {
    /// An empty clock stamped with the current time
    pub fn new() -> Self {
        Self::with_timestamp(now_millis())
    }

    /// An empty clock with an explicit timestamp
    pub fn with_timestamp(timestamp: i64) -> Self {
        Self {
            entries: Vec::new(),
            timestamp,
        }
    }

    /// Build a clock from arbitrary entries.
    ///
    /// Entries are sorted by node id; a node listed twice, or more entries
    /// than the encoding can count, is rejected.
    pub fn from_entries(mut entries: Vec<ClockEntry>, timestamp: i64) -> Result<Self> {
        check_entry_count(entries.len())?;
        entries.sort_by_key(|e| e.node_id);
        if let Some(pair) = entries.windows(2).find(|w| w[0].node_id == w[1].node_id) {
            return Err(EmberError::MalformedVersion(format!(
                "node {} appears more than once",
                pair[0].node_id
            )));
        }
        Ok(Self { entries, timestamp })
    }

    pub fn entries(&self) -> &[ClockEntry] {
        &self.entries
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Counter recorded for `node_id` (0 if the node never wrote)
    pub fn version_of(&self, node_id: u16) -> u64 {
        self.entries
            .binary_search_by_key(&node_id, |e| e.node_id)
            .map(|idx| self.entries[idx].version)
            .unwrap_or(0)
    }

    /// A new clock advanced by one for `node_id`
    pub fn incremented(&self, node_id: u16, timestamp: i64) -> Result<VectorClock> {
        let mut entries = self.entries.clone();
        match entries.binary_search_by_key(&node_id, |e| e.node_id) {
            Ok(idx) => entries[idx].version = entries[idx].version.saturating_add(1),
            Err(idx) => {
                check_entry_count(entries.len() + 1)?;
                entries.insert(idx, ClockEntry::new(node_id, 1));
            }
        }
        Ok(VectorClock { entries, timestamp })
    }

    /// Pointwise maximum of two clocks; the later timestamp wins
    pub fn merge(&self, other: &VectorClock) -> Result<VectorClock> {
        let mut entries = Vec::with_capacity(self.entries.len().max(other.entries.len()));
        let (mut i, mut j) = (0, 0);
        while i < self.entries.len() && j < other.entries.len() {
            let (a, b) = (self.entries[i], other.entries[j]);
            match a.node_id.cmp(&b.node_id) {
                Ordering::Equal => {
                    entries.push(ClockEntry::new(a.node_id, a.version.max(b.version)));
                    i += 1;
                    j += 1;
                }
                Ordering::Less => {
                    entries.push(a);
                    i += 1;
                }
                Ordering::Greater => {
                    entries.push(b);
                    j += 1;
                }
            }
        }
        entries.extend_from_slice(&self.entries[i..]);
        entries.extend_from_slice(&other.entries[j..]);
        check_entry_count(entries.len())?;

        Ok(VectorClock {
            entries,
            timestamp: self.timestamp.max(other.timestamp),
        })
    }

    /// Compare causal positions. Timestamps are ignored.
    pub fn compare(&self, other: &VectorClock) -> Occurred {
        let mut self_bigger = false;
        let mut other_bigger = false;

        let (a, b) = (&self.entries, &other.entries);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].node_id.cmp(&b[j].node_id) {
                Ordering::Equal => {
                    match a[i].version.cmp(&b[j].version) {
                        Ordering::Greater => self_bigger = true,
                        Ordering::Less => other_bigger = true,
                        Ordering::Equal => {}
                    }
                    i += 1;
                    j += 1;
                }
                // a node only `self` knows about
                Ordering::Less => {
                    self_bigger |= a[i].version > 0;
                    i += 1;
                }
                Ordering::Greater => {
                    other_bigger |= b[j].version > 0;
                    j += 1;
                }
            }
        }
        self_bigger |= a[i..].iter().any(|e| e.version > 0);
        other_bigger |= b[j..].iter().any(|e| e.version > 0);

        match (self_bigger, other_bigger) {
            (true, true) => Occurred::Concurrently,
            (true, false) => Occurred::After,
            (false, true) => Occurred::Before,
            (false, false) => Occurred::Equal,
        }
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Width in bytes of each counter in the encoded form
    fn version_size(&self) -> usize {
        let max = self.entries.iter().map(|e| e.version).max().unwrap_or(0);
        let bits = 64 - max.leading_zeros() as usize;
        bits.div_ceil(8).max(1)
    }

    /// Length of [`VectorClock::to_bytes`] output
    pub fn size_in_bytes(&self) -> usize {
        CLOCK_HEADER_SIZE
            + self.entries.len() * (NODE_ID_SIZE + self.version_size())
            + CLOCK_TIMESTAMP_SIZE
    }

    /// Encode into the canonical byte form
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.size_in_bytes());
        self.encode_into(&mut buf);
        buf.to_vec()
    }

    /// Append the canonical byte form to `buf`
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        let version_size = self.version_size();
        buf.put_u16(self.entries.len() as u16);
        buf.put_u8(version_size as u8);
        for entry in &self.entries {
            buf.put_u16(entry.node_id);
            buf.put_uint(entry.version, version_size);
        }
        buf.put_i64(self.timestamp);
    }

    /// Decode a clock from the front of `bytes`.
    ///
    /// Returns the clock and the number of bytes it occupied; anything after
    /// that belongs to the caller.
    pub fn from_bytes(bytes: &[u8]) -> Result<(VectorClock, usize)> {
        if bytes.len() < CLOCK_HEADER_SIZE {
            return Err(EmberError::MalformedVersion(format!(
                "need at least {} bytes for a clock header, got {}",
                CLOCK_HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut buf = bytes;
        let num_entries = buf.get_u16() as usize;
        let version_size = buf.get_u8() as usize;

        if version_size == 0 || version_size > MAX_VERSION_SIZE {
            return Err(EmberError::MalformedVersion(format!(
                "invalid counter width {} (expected 1..={})",
                version_size, MAX_VERSION_SIZE
            )));
        }

        let size = CLOCK_HEADER_SIZE
            + num_entries * (NODE_ID_SIZE + version_size)
            + CLOCK_TIMESTAMP_SIZE;
        if bytes.len() < size {
            return Err(EmberError::MalformedVersion(format!(
                "clock with {} entries needs {} bytes, only {} available",
                num_entries,
                size,
                bytes.len()
            )));
        }

        let mut entries = Vec::with_capacity(num_entries);
        for _ in 0..num_entries {
            let node_id = buf.get_u16();
            let version = buf.get_uint(version_size);
            if let Some(last) = entries.last().map(|e: &ClockEntry| e.node_id) {
                if node_id <= last {
                    return Err(EmberError::MalformedVersion(format!(
                        "node ids out of order: {} after {}",
                        node_id, last
                    )));
                }
            }
            entries.push(ClockEntry::new(node_id, version));
        }
        let timestamp = buf.get_i64();

        Ok((VectorClock { entries, timestamp }, size))
    }
}

impl Default for VectorClock {
    fn default() -> Self {
        Self::new()
    }
}

fn check_entry_count(count: usize) -> Result<()> {
    if count > MAX_CLOCK_ENTRIES {
        return Err(EmberError::MalformedVersion(format!(
            "{} clock entries, at most {} can be encoded",
            count, MAX_CLOCK_ENTRIES
        )));
    }
    Ok(())
}

/// Current time in unix millis
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
