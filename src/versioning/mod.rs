//! Versioning Module
//!
//! Causal version stamps attached to every stored value.
//!
//! ## Responsibilities
//! - Vector clock arithmetic (increment, merge, compare)
//! - Self-describing binary encoding of clocks
//! - `clock || value` blobs used by GET responses, PUT payloads and
//!   partition streams
//!
//! Concurrent versions of one key are kept side by side and returned as-is;
//! nothing in this module resolves conflicts.

mod clock;
mod versioned;

pub use clock::{
    now_millis, ClockEntry, Occurred, VectorClock, CLOCK_HEADER_SIZE, CLOCK_TIMESTAMP_SIZE,
    MAX_CLOCK_ENTRIES,
};
pub use versioned::Versioned;
