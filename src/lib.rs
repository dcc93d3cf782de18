//! # EmberKV
//!
//! The request-handling side of a storage node in a distributed key-value
//! store:
//! - Binary request/response protocol over TCP
//! - Vector-clock versioned values, concurrent versions kept side by side
//! - Named stores resolved from a shared, immutable registry
//! - Partition streaming for rebalancing data between nodes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │               (one thread per connection)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Request Handler                             │
//! │     header → store lookup → op handler → flushed response    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────────┐
//!   │ Frame codec │          │  Store Registry  │
//!   │ Clock codec │          │ (name → Store)   │
//!   └─────────────┘          └────────┬─────────┘
//!                                     │
//!                                     ▼
//!                             ┌───────────────┐
//!                             │     Store     │
//!                             │ (+ streaming) │
//!                             └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod versioning;
pub mod protocol;
pub mod store;
pub mod handler;
pub mod network;
pub mod cluster;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EmberError, Result};
pub use config::Config;
pub use handler::{RequestHandler, RequestOutcome};
pub use store::{InMemoryStore, PartitionStreamable, Store, StoreRegistry};
pub use versioning::{VectorClock, Versioned};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
