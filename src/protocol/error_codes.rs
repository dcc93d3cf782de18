//! Error code mapping
//!
//! Translates errors to the 2-byte wire code written in front of an error
//! message, and back again on the client side.
//!
//! ### Codes
//! - 0: success (never produced by the mapper)
//! - 1: unknown / generic failure
//! - 2..=10: one code per recoverable kind, see [`ErrorCode`]

use crate::error::EmberError;

/// Response code meaning "no error"
pub const SUCCESS: u16 = 0;

/// Wire error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Unknown = 1,
    InsufficientOperationalNodes = 2,
    StoreOperationFailure = 3,
    ObsoleteVersion = 4,
    StoreNotFound = 5,
    UnreachableStore = 6,
    InconsistentData = 7,
    PersistenceFailure = 8,
    CapabilityUnsupported = 9,
    MalformedVersion = 10,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Code for a raw wire value; `None` for success and unassigned values
    pub fn from_u16(code: u16) -> Option<Self> {
        let code = match code {
            1 => ErrorCode::Unknown,
            2 => ErrorCode::InsufficientOperationalNodes,
            3 => ErrorCode::StoreOperationFailure,
            4 => ErrorCode::ObsoleteVersion,
            5 => ErrorCode::StoreNotFound,
            6 => ErrorCode::UnreachableStore,
            7 => ErrorCode::InconsistentData,
            8 => ErrorCode::PersistenceFailure,
            9 => ErrorCode::CapabilityUnsupported,
            10 => ErrorCode::MalformedVersion,
            _ => return None,
        };
        Some(code)
    }
}

/// Bidirectional mapping between errors and wire codes
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorCodeMapper;

impl ErrorCodeMapper {
    pub fn new() -> Self {
        Self
    }

    /// Wire code for an error. Kinds without a dedicated code map to
    /// [`ErrorCode::Unknown`]; the result is never [`SUCCESS`].
    pub fn code_for(&self, error: &EmberError) -> u16 {
        let code = match error {
            EmberError::InsufficientOperationalNodes(_) => ErrorCode::InsufficientOperationalNodes,
            EmberError::StoreOperationFailure(_) => ErrorCode::StoreOperationFailure,
            EmberError::ObsoleteVersion(_) => ErrorCode::ObsoleteVersion,
            EmberError::StoreNotFound(_) => ErrorCode::StoreNotFound,
            EmberError::UnreachableStore(_) => ErrorCode::UnreachableStore,
            EmberError::InconsistentData(_) => ErrorCode::InconsistentData,
            EmberError::PersistenceFailure(_) => ErrorCode::PersistenceFailure,
            EmberError::CapabilityUnsupported(_) => ErrorCode::CapabilityUnsupported,
            EmberError::MalformedVersion(_) => ErrorCode::MalformedVersion,
            _ => ErrorCode::Unknown,
        };
        code.as_u16()
    }

    /// Rebuild an error from a non-zero code and its message
    pub fn error_for(&self, code: u16, message: String) -> EmberError {
        match ErrorCode::from_u16(code) {
            Some(ErrorCode::InsufficientOperationalNodes) => {
                EmberError::InsufficientOperationalNodes(message)
            }
            Some(ErrorCode::StoreOperationFailure) => EmberError::StoreOperationFailure(message),
            Some(ErrorCode::ObsoleteVersion) => EmberError::ObsoleteVersion(message),
            Some(ErrorCode::StoreNotFound) => EmberError::StoreNotFound(message),
            Some(ErrorCode::UnreachableStore) => EmberError::UnreachableStore(message),
            Some(ErrorCode::InconsistentData) => EmberError::InconsistentData(message),
            Some(ErrorCode::PersistenceFailure) => EmberError::PersistenceFailure(message),
            Some(ErrorCode::CapabilityUnsupported) => EmberError::CapabilityUnsupported(message),
            Some(ErrorCode::MalformedVersion) => EmberError::MalformedVersion(message),
            Some(ErrorCode::Unknown) | None => EmberError::Backend(message),
        }
    }
}
