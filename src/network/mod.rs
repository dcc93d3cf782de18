//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection, blocking I/O
//! - Requests routed through the connection's `RequestHandler`

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
