//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::config::Config;
use crate::error::Result;
use crate::store::StoreRegistry;

use super::Connection;

/// How long the accept loop waits for a shutdown signal between polls
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for an EmberKV node
pub struct Server {
    config: Config,
    registry: Arc<StoreRegistry>,
    listener: TcpListener,

    /// Connections currently being served
    active: Arc<AtomicUsize>,

    shutdown_tx: Sender<()>,
    shutdown_rx: Receiver<()>,
}

/// Stops a running server's accept loop
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Sender<()>,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting connections
    pub fn shutdown(&self) {
        // The server may already be gone
        let _ = self.tx.send(());
    }
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, registry: Arc<StoreRegistry>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;
        let (shutdown_tx, shutdown_rx) = channel::unbounded();

        Ok(Self {
            config,
            registry,
            listener,
            active: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Accept connections until shut down (blocking).
    ///
    /// Connections already running are left to finish on their own threads.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            "Listening on {} ({} stores: {:?})",
            self.local_addr()?,
            self.registry.len(),
            self.registry.names()
        );

        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => self.spawn_connection(stream, addr),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    match self.shutdown_rx.recv_timeout(ACCEPT_POLL_INTERVAL) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                }
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        tracing::info!("Server stopped accepting connections");
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let active = self.active.fetch_add(1, Ordering::SeqCst);
        if active >= self.config.max_connections {
            self.active.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!(
                "Refusing connection from {}: {} connections already open",
                addr,
                active
            );
            return;
        }

        let guard = ActiveGuard(Arc::clone(&self.active));
        let registry = Arc::clone(&self.registry);
        let config = self.config.clone();

        let spawned = thread::Builder::new()
            .name(format!("emberkv-conn-{}", addr))
            .spawn(move || {
                let _guard = guard;
                if let Err(e) = serve(stream, registry, &config) {
                    tracing::debug!("Connection from {} ended with error: {}", addr, e);
                }
            });

        if let Err(e) = spawned {
            // The closure, and with it the guard, was dropped
            tracing::warn!("Failed to spawn connection thread for {}: {}", addr, e);
        }
    }
}

fn serve(stream: TcpStream, registry: Arc<StoreRegistry>, config: &Config) -> Result<()> {
    // Accepted sockets may inherit the listener's non-blocking mode
    stream.set_nonblocking(false)?;

    let mut connection = Connection::new(stream, registry, config.max_frame_size)?;
    connection.set_timeouts(config.read_timeout_ms, config.write_timeout_ms)?;
    connection.handle()
}

/// Decrements the active connection count when a connection thread ends
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
