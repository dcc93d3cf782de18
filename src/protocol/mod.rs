//! Protocol Module
//!
//! Defines the binary wire protocol between clients and storage nodes.
//! All integers are big-endian.
//!
//! ### Request Format
//! ```text
//! ┌──────────┬────────────┬─────────────┬───────────────────────┐
//! │ Op (1)   │ NameLen(2) │ Store name  │   Op-specific payload │
//! └──────────┴────────────┴─────────────┴───────────────────────┘
//! ```
//!
//! ### Op Codes
//! - 0x01: GET                    - key
//! - 0x02: PUT                    - key + blob (clock || value)
//! - 0x03: DELETE                 - key + version (u16 length)
//! - 0x04: GET_PARTITIONS_STREAM  - partition id list
//! - 0x05: PUT_PARTITIONS_STREAM  - entries until keyLen == -1
//!
//! ### Response Format
//! ```text
//! ┌──────────┬─────────────────────────────────────────────────┐
//! │ Code (2) │  success payload  |  MsgLen (2) + message       │
//! └──────────┴─────────────────────────────────────────────────┘
//! ```

mod op_code;
mod frame;
mod error_codes;
pub mod client;

pub use op_code::OpCode;
pub use frame::{FrameReader, FrameWriter, ABSENT_KEY};
pub use error_codes::{ErrorCode, ErrorCodeMapper, SUCCESS};
pub use client::StoreClient;
