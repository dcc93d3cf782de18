//! Op code definitions
//!
//! The closed set of request types. Values are shared by client and server.

use std::fmt;

use crate::error::EmberError;

/// Request op codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Get = 0x01,
    Put = 0x02,
    Delete = 0x03,
    GetPartitionsStream = 0x04,
    PutPartitionsStream = 0x05,
}

impl OpCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the op uses the partition streaming sub-protocol
    pub fn is_streaming(self) -> bool {
        matches!(self, OpCode::GetPartitionsStream | OpCode::PutPartitionsStream)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = EmberError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(OpCode::Get),
            0x02 => Ok(OpCode::Put),
            0x03 => Ok(OpCode::Delete),
            0x04 => Ok(OpCode::GetPartitionsStream),
            0x05 => Ok(OpCode::PutPartitionsStream),
            other => Err(EmberError::UnknownOpCode(other)),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpCode::Get => "GET",
            OpCode::Put => "PUT",
            OpCode::Delete => "DELETE",
            OpCode::GetPartitionsStream => "GET_PARTITIONS_STREAM",
            OpCode::PutPartitionsStream => "PUT_PARTITIONS_STREAM",
        };
        f.write_str(name)
    }
}
