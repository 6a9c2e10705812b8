//! # Record Server
//!
//! A [`StreamServer`] accepts any number of TCP clients. Each byte a client
//! sends is answered with one freshly generated [`fleetgen::ParentRecord`],
//! framed by [`RecordCodec`](crate::RecordCodec).
//!
//! ## Lifecycle
//!
//! ```text
//!     start(host, port)                       stop()
//! Stopped ---------------> Listening ----------------> Stopped
//!                          |  accept loop
//!                          |  handler per connection
//!                          '- all tracked by one TaskTracker
//! ```
//!
//! `start` on a listening server and `stop` on a stopped server are no-ops.
//! Stopping cancels the accept loop and every handler, then waits (bounded by
//! [`ServerConfig::shutdown_timeout`]) for them to drain.

mod connection;

use crate::{
    config::ServerConfig,
    error::{Error, Result},
};
use connection::ConnectionTable;
use core::time::Duration;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// TCP server that hands out generated parent records on request.
///
/// Cheap to clone; clones control the same listener.
#[derive(Clone)]
pub struct StreamServer {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    config: ServerConfig,
    state: Mutex<ServerState>,
    // Serializes start/stop across their await points.
    lifecycle: tokio::sync::Mutex<()>,
    connections: Arc<ConnectionTable>,
}

enum ServerState {
    Stopped,
    Listening(Listening),
}

struct Listening {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl StreamServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                config,
                state: Mutex::new(ServerState::Stopped),
                lifecycle: tokio::sync::Mutex::new(()),
                connections: Arc::new(ConnectionTable::default()),
            }),
        }
    }

    /// Binds `host:port` and starts accepting clients.
    ///
    /// Port `0` picks an ephemeral port; the bound address is returned either
    /// way. If the server is already listening, its current address is
    /// returned and nothing else happens.
    ///
    /// # Errors
    /// - [`Error::Bind`] if the socket cannot be bound.
    pub async fn start(&self, host: &str, port: u16) -> Result<SocketAddr> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        if let Some(addr) = self.local_addr() {
            #[cfg(feature = "tracing")]
            tracing::debug!(%addr, "Server already listening");
            return Ok(addr);
        }

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| Error::Bind {
                addr: format!("{host}:{port}"),
                reason: e.to_string(),
            })?;
        let local_addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        tracker.spawn(accept_loop(
            listener,
            shutdown.clone(),
            tracker.clone(),
            Arc::clone(&self.inner.connections),
            self.inner.config.clone(),
        ));

        *self.inner.state.lock() = ServerState::Listening(Listening {
            local_addr,
            shutdown,
            tracker,
        });

        #[cfg(feature = "tracing")]
        tracing::info!(addr = %local_addr, "Server listening");

        Ok(local_addr)
    }

    /// Stops accepting, closes every open connection, and waits for the
    /// handlers to finish.
    pub async fn stop(&self) {
        let _lifecycle = self.inner.lifecycle.lock().await;
        let previous = {
            let mut state = self.inner.state.lock();
            core::mem::replace(&mut *state, ServerState::Stopped)
        };
        let ServerState::Listening(listening) = previous else {
            return;
        };

        listening.shutdown.cancel();
        listening.tracker.close();

        if tokio::time::timeout(self.inner.config.shutdown_timeout, listening.tracker.wait())
            .await
            .is_err()
        {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                addr = %listening.local_addr,
                remaining = listening.tracker.len(),
                "Server stop timed out waiting for connection handlers"
            );
        }

        #[cfg(feature = "tracing")]
        tracing::info!(addr = %listening.local_addr, "Server stopped");
    }

    pub fn is_listening(&self) -> bool {
        matches!(*self.inner.state.lock(), ServerState::Listening(_))
    }

    /// Address of the listening socket, if the server is running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.inner.state.lock() {
            ServerState::Listening(listening) => Some(listening.local_addr),
            ServerState::Stopped => None,
        }
    }

    /// Number of client connections currently being served.
    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }
}

impl Default for StreamServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl Drop for ServerInner {
    fn drop(&mut self) {
        if let ServerState::Listening(listening) = self.state.get_mut() {
            listening.shutdown.cancel();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    connections: Arc<ConnectionTable>,
    config: ServerConfig,
) {
    loop {
        let accepted = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                let conn = connections.track(peer);
                tracker.spawn(connection::handle_connection(
                    stream,
                    conn,
                    shutdown.child_token(),
                    config.clone(),
                ));
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Accept failed: {_e}");

                tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                }
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Accept loop stopped");
}
