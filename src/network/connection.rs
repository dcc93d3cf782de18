//! Connection Handler
//!
//! Runs one client's request stream through a `RequestHandler` until the
//! peer hangs up or the stream becomes unusable.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{EmberError, Result};
use crate::handler::{RequestHandler, RequestOutcome};
use crate::store::StoreRegistry;

/// Handles a single client connection
pub struct Connection {
    /// Request handler over buffered halves of the socket
    handler: RequestHandler<BufReader<TcpStream>, BufWriter<TcpStream>>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Wrap an accepted socket.
    ///
    /// Every length the peer declares is bounded by `max_frame_size`.
    pub fn new(
        stream: TcpStream,
        registry: Arc<StoreRegistry>,
        max_frame_size: usize,
    ) -> Result<Self> {
        let peer_addr = match stream.peer_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => "unknown".to_string(),
        };

        // Responses are flushed once per request; don't let Nagle hold them back
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);

        Ok(Self {
            handler: RequestHandler::with_max_frame_size(registry, reader, writer, max_frame_size),
            peer_addr,
        })
    }

    /// Apply socket timeouts; 0 leaves that direction without one
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let to_duration = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));

        self.handler.reader().get_ref().set_read_timeout(to_duration(read_ms))?;
        self.handler.writer().get_ref().set_write_timeout(to_duration(write_ms))?;
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Processes requests strictly one after another. Returns when the client
    /// disconnects, or with the error that forced the connection closed.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            match self.handler.handle_request() {
                Ok(RequestOutcome::Completed) => continue,
                Ok(RequestOutcome::Closed) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(EmberError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Connection to {} ended: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Closing connection to {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Peer went away or stopped talking; not a server error
fn is_disconnect(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind::*;
    // WouldBlock is what a read timeout looks like on Unix, TimedOut on Windows
    matches!(
        kind,
        ConnectionReset | ConnectionAborted | BrokenPipe | WouldBlock | TimedOut
    )
}
