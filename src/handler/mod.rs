//! Request Handler
//!
//! Interprets one connection's request stream: reads a request header,
//! resolves the named store, runs the operation and writes its response.
//!
//! ## Dispatch States
//! ```text
//! AwaitingHeader ──► Routing ──► Executing ──► ResponseWritten
//!                       │                            ▲
//!                       └──── unknown store ─────────┘
//! ```
//! The output is flushed exactly once per request, whichever path was taken.
//!
//! ## Error Policy
//! - Recoverable errors (unknown store, missing capability, malformed
//!   version, backend failures) are answered with `code + message` and the
//!   connection stays usable. A rejected request's payload is still read off
//!   the stream, undecoded, so the next request stays aligned.
//! - Any error *returned* from [`RequestHandler::handle_request`] is fatal:
//!   the byte stream can no longer be trusted and the connection must close.

mod single_key;
mod stream;

use std::io::{Read, Write};
use std::sync::Arc;

use crate::config::DEFAULT_MAX_FRAME_SIZE;
use crate::error::{EmberError, Result};
use crate::protocol::{ErrorCodeMapper, FrameReader, FrameWriter, OpCode, SUCCESS};
use crate::store::StoreRegistry;

/// Where the handler is within the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    AwaitingHeader,
    Routing,
    Executing,
    ResponseWritten,
}

/// Result of one `handle_request` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A response was written; the next request may follow
    Completed,

    /// The peer closed the stream before starting a new request
    Closed,
}

/// Per-connection request handler
pub struct RequestHandler<R, W> {
    /// Shared, read-only store registry
    registry: Arc<StoreRegistry>,

    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    mapper: ErrorCodeMapper,
    state: DispatchState,
}

impl<R: Read, W: Write> RequestHandler<R, W> {
    pub fn new(registry: Arc<StoreRegistry>, reader: R, writer: W) -> Self {
        Self::with_max_frame_size(registry, reader, writer, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a handler that rejects any declared length above `max_frame_size`
    pub fn with_max_frame_size(
        registry: Arc<StoreRegistry>,
        reader: R,
        writer: W,
        max_frame_size: usize,
    ) -> Self {
        Self {
            registry,
            reader: FrameReader::with_max_len(reader, max_frame_size),
            writer: FrameWriter::new(writer),
            mapper: ErrorCodeMapper::new(),
            state: DispatchState::AwaitingHeader,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn reader(&self) -> &R {
        self.reader.get_ref()
    }

    pub fn writer(&self) -> &W {
        self.writer.get_ref()
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }

    /// Handle a single request.
    ///
    /// Returns `Closed` if the stream ended cleanly before a new request, and
    /// an error only when the connection must be torn down.
    pub fn handle_request(&mut self) -> Result<RequestOutcome> {
        self.transition(DispatchState::AwaitingHeader);

        let Some(op_byte) = self.reader.read_request_start()? else {
            return Ok(RequestOutcome::Closed);
        };

        let result = self.dispatch(op_byte);

        self.transition(DispatchState::ResponseWritten);
        let flushed = self.writer.flush();

        if let Err(ref e) = result {
            tracing::warn!("Fatal protocol error: {}", e);
        }
        result.and(flushed).map(|_| RequestOutcome::Completed)
    }

    fn dispatch(&mut self, op_byte: u8) -> Result<()> {
        let op = OpCode::try_from(op_byte)?;
        let store_name = self.reader.read_utf("store name")?;
        self.transition(DispatchState::Routing);

        let registry = Arc::clone(&self.registry);
        let Some(entry) = registry.get(&store_name) else {
            tracing::debug!(op = %op, store = %store_name, "Request for unknown store");
            return self.reject(op, &EmberError::store_not_found(&store_name));
        };

        self.transition(DispatchState::Executing);
        tracing::trace!(op = %op, store = %store_name, "Dispatching request");

        match op {
            OpCode::Get => {
                let key = self.read_key(op)?;
                self.handle_get(entry.store().as_ref(), &key)
            }
            OpCode::Put => {
                let key = self.read_key(op)?;
                self.handle_put(entry.store().as_ref(), &key)
            }
            OpCode::Delete => {
                let key = self.read_key(op)?;
                self.handle_delete(entry.store().as_ref(), &key)
            }
            OpCode::GetPartitionsStream => self.handle_get_partitions(entry),
            OpCode::PutPartitionsStream => self.handle_put_partitions(entry),
        }
    }

    /// Single-key ops require a present key
    fn read_key(&mut self, op: OpCode) -> Result<Vec<u8>> {
        self.reader.read_nullable("key")?.ok_or_else(|| {
            EmberError::Framing(format!("{} request carries an absent key", op))
        })
    }

    /// Answer `error` to a request that will not be executed.
    ///
    /// The op's payload is consumed but never decoded, so the next request
    /// starts on the right byte.
    fn reject(&mut self, op: OpCode, error: &EmberError) -> Result<()> {
        self.skip_payload(op)?;
        self.write_error(error)
    }

    fn skip_payload(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::Get => {
                self.reader.read_nullable("key")?;
            }
            OpCode::Put => {
                self.reader.read_nullable("key")?;
                self.reader.read_int_prefixed("put payload")?;
            }
            OpCode::Delete => {
                self.reader.read_nullable("key")?;
                self.reader.read_short_prefixed("version")?;
            }
            OpCode::GetPartitionsStream => {
                self.reader.read_int_list("partition list")?;
            }
            OpCode::PutPartitionsStream => {
                self.skip_stream()?;
            }
        }
        Ok(())
    }

    /// Consume stream entries up to and including the terminator
    fn skip_stream(&mut self) -> Result<usize> {
        let mut skipped = 0usize;
        while self.reader.read_stream_entry()?.is_some() {
            skipped += 1;
        }
        Ok(skipped)
    }

    fn write_success(&mut self) -> Result<()> {
        self.writer.write_u16(SUCCESS)
    }

    /// Write `code + message` for a recoverable error
    fn write_error(&mut self, error: &EmberError) -> Result<()> {
        let code = self.mapper.code_for(error);
        tracing::debug!(code, "Answering with error: {}", error);
        self.writer.write_u16(code)?;
        self.writer.write_utf_truncated(&error.message())
    }

    fn transition(&mut self, next: DispatchState) {
        tracing::trace!(from = ?self.state, to = ?next, "Dispatch state");
        self.state = next;
    }
}
