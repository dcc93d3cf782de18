//! Error types for EmberKV
//!
//! Provides a unified error type for all operations.
//!
//! Errors fall into two groups:
//! - **Recoverable**: reported to the client as an error frame; the connection
//!   stays open (store lookup, capability, version decoding, backend failures).
//! - **Fatal**: the request stream can no longer be trusted and the connection
//!   must be closed (framing, unknown op code, I/O).

use thiserror::Error;

/// Result type alias using EmberError
pub type Result<T> = std::result::Result<T, EmberError>;

/// Unified error type for EmberKV operations
#[derive(Debug, Error)]
pub enum EmberError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors (connection-fatal)
    // -------------------------------------------------------------------------
    #[error("Framing error: {0}")]
    Framing(String),

    #[error("Unknown op code: {0}")]
    UnknownOpCode(u8),

    // -------------------------------------------------------------------------
    // Request Errors (answered with an error frame)
    // -------------------------------------------------------------------------
    #[error("Malformed version: {0}")]
    MalformedVersion(String),

    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("Capability unsupported: {0}")]
    CapabilityUnsupported(String),

    // -------------------------------------------------------------------------
    // Backend Errors (raised by stores)
    // -------------------------------------------------------------------------
    #[error("Obsolete version: {0}")]
    ObsoleteVersion(String),

    #[error("Insufficient operational nodes: {0}")]
    InsufficientOperationalNodes(String),

    #[error("Store operation failed: {0}")]
    StoreOperationFailure(String),

    #[error("Store unreachable: {0}")]
    UnreachableStore(String),

    #[error("Inconsistent data: {0}")]
    InconsistentData(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Backend error: {0}")]
    Backend(String),

    // -------------------------------------------------------------------------
    // Snapshot / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EmberError {
    /// Build the error reported when a request names an unregistered store
    pub fn store_not_found(store_name: &str) -> Self {
        EmberError::StoreNotFound(format!("No store named '{}'.", store_name))
    }

    /// Build the error reported when a store cannot stream partitions
    pub fn capability_unsupported(store_name: &str) -> Self {
        EmberError::CapabilityUnsupported(format!(
            "Store '{}' does not support partition streaming",
            store_name
        ))
    }

    /// The raw diagnostic text, without the kind prefix added by `Display`.
    ///
    /// This is what travels on the wire, so a client rebuilding the error from
    /// `(code, message)` ends up with the same text.
    pub fn message(&self) -> String {
        match self {
            EmberError::Io(e) => e.to_string(),
            EmberError::UnknownOpCode(code) => format!("Unknown op code: {}", code),
            EmberError::Framing(msg)
            | EmberError::MalformedVersion(msg)
            | EmberError::StoreNotFound(msg)
            | EmberError::CapabilityUnsupported(msg)
            | EmberError::ObsoleteVersion(msg)
            | EmberError::InsufficientOperationalNodes(msg)
            | EmberError::StoreOperationFailure(msg)
            | EmberError::UnreachableStore(msg)
            | EmberError::InconsistentData(msg)
            | EmberError::PersistenceFailure(msg)
            | EmberError::Backend(msg)
            | EmberError::Snapshot(msg)
            | EmberError::Config(msg) => msg.clone(),
        }
    }

    /// Whether the error leaves the request stream misaligned.
    ///
    /// Fatal errors are never answered with an error frame; the connection is
    /// torn down instead.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EmberError::Io(_) | EmberError::Framing(_) | EmberError::UnknownOpCode(_)
        )
    }
}
