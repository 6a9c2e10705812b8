//! # Record Client
//!
//! A [`StreamClient`] holds at most one outbound session to a record server
//! and republishes what it observes as [`ClientEvent`]s.
//!
//! ## State Machine
//!
//! ```text
//!               connect()                 handshake ok
//! Disconnected -----------> Connecting -----------------> Connected
//!      ^                        |                             |
//!      |   timeout / error /    |     peer close / fault /    |
//!      '---- disconnect() ------'------- disconnect() --------'
//! ```
//!
//! Every session runs two background loops:
//! - a receive loop that drains the socket on a fixed cadence and decodes
//!   complete frames into [`ClientEvent::RecordReceived`];
//! - a keepalive loop that probes the socket and republishes
//!   `ConnectionStatusChanged(true)` while the peer is alive.
//!
//! Both loops share the read half behind one async lock, so a drain and a
//! probe never interleave. Sessions are numbered; a loop that outlives its
//! session cannot tear down a newer one.
//!
//! An optional third loop sends a trigger byte on an interval
//! ([`StreamClient::start_requesting`]).

mod event;
mod link;
mod tasks;

pub use event::*;

use crate::{
    config::ClientConfig,
    error::{Error, Result},
    wire::TRIGGER,
};
use core::time::Duration;
use link::Link;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, tcp::OwnedWriteHalf};
use tokio::sync::{Mutex as AsyncMutex, broadcast};
use tokio_util::sync::CancellationToken;

/// TCP client that receives generated parent records from a
/// [`StreamServer`](crate::StreamServer).
///
/// Dropping the client ends its session and background loops.
pub struct StreamClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    config: ClientConfig,
    shared: Mutex<Shared>,
    events: broadcast::Sender<ClientEvent>,
}

struct Shared {
    state: ConnectionState,
    // Bumped by every connect attempt and every disconnect.
    epoch: u64,
    session: Option<Session>,
}

struct Session {
    handle: SessionHandle,
    peer: SocketAddr,
    requests: Option<CancellationToken>,
}

/// Everything a background loop needs to work on one session.
#[derive(Clone)]
pub(crate) struct SessionHandle {
    pub(crate) id: u64,
    pub(crate) shutdown: CancellationToken,
    pub(crate) link: Arc<AsyncMutex<Link>>,
    pub(crate) writer: Arc<AsyncMutex<OwnedWriteHalf>>,
}

impl Shared {
    /// Moves to `to` and publishes the boolean status change, if any.
    fn transition(&mut self, to: ConnectionState, events: &broadcast::Sender<ClientEvent>) {
        let from = core::mem::replace(&mut self.state, to);
        let status = match (from, to) {
            (ConnectionState::Connected, ConnectionState::Connected)
            | (ConnectionState::Disconnected, ConnectionState::Disconnected)
            | (_, ConnectionState::Connecting) => None,
            (_, ConnectionState::Connected) => Some(true),
            (_, ConnectionState::Disconnected) => Some(false),
        };
        if let Some(connected) = status {
            let _ = events.send(ClientEvent::ConnectionStatusChanged(connected));
        }
    }

    fn current(&self, id: u64) -> Option<&Session> {
        self.session.as_ref().filter(|s| s.handle.id == id)
    }
}

impl StreamClient {
    pub fn new(config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(ClientInner {
                config,
                shared: Mutex::new(Shared {
                    state: ConnectionState::Disconnected,
                    epoch: 0,
                    session: None,
                }),
                events,
            }),
        }
    }

    /// Opens a session to `host:port`.
    ///
    /// # Errors
    /// - [`Error::ConnectInProgress`] if another connect has not finished.
    /// - [`Error::ConnectTimeout`] if the handshake outlasts
    ///   [`ClientConfig::connect_timeout`].
    /// - [`Error::Connect`] on any transport failure.
    /// - [`Error::ConnectAborted`] if [`disconnect`](Self::disconnect) ran
    ///   while the handshake was in flight.
    pub async fn connect(&self, host: &str, port: u16) -> Result<ConnectOutcome> {
        let attempt = {
            let mut shared = self.inner.shared.lock();
            match shared.state {
                ConnectionState::Connected => return Ok(ConnectOutcome::AlreadyConnected),
                ConnectionState::Connecting => return Err(Error::ConnectInProgress),
                ConnectionState::Disconnected => {}
            }
            shared.epoch += 1;
            shared.transition(ConnectionState::Connecting, &self.inner.events);
            shared.epoch
        };
        let mut pending = PendingConnect {
            inner: &self.inner,
            attempt,
            armed: true,
        };

        let addr = format!("{host}:{port}");
        #[cfg(feature = "tracing")]
        tracing::info!(%addr, "Connecting");

        let timeout = self.inner.config.connect_timeout;
        let stream = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(Error::Connect {
                    addr,
                    reason: e.to_string(),
                });
            }
            Err(_elapsed) => {
                return Err(Error::ConnectTimeout { addr, timeout });
            }
        };

        let peer = match stream.peer_addr() {
            Ok(peer) => peer,
            Err(e) => {
                return Err(Error::Connect {
                    addr,
                    reason: e.to_string(),
                });
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            return Err(Error::Connect {
                addr,
                reason: e.to_string(),
            });
        }
        let (reader, writer) = stream.into_split();

        let handle = SessionHandle {
            id: attempt,
            shutdown: CancellationToken::new(),
            link: Arc::new(AsyncMutex::new(Link::new(
                reader,
                self.inner.config.max_frame_length,
            ))),
            writer: Arc::new(AsyncMutex::new(writer)),
        };

        {
            let mut shared = self.inner.shared.lock();
            if shared.state != ConnectionState::Connecting || shared.epoch != attempt {
                #[cfg(feature = "tracing")]
                tracing::debug!(%addr, "Connect aborted by disconnect");
                return Err(Error::ConnectAborted);
            }

            shared.session = Some(Session {
                handle: handle.clone(),
                peer,
                requests: None,
            });
            shared.transition(ConnectionState::Connected, &self.inner.events);
            pending.armed = false;

            tokio::spawn(tasks::receive_loop(Arc::clone(&self.inner), handle.clone()));
            tokio::spawn(tasks::keepalive_loop(Arc::clone(&self.inner), handle));
        }

        #[cfg(feature = "tracing")]
        tracing::info!(%peer, "Connected");

        Ok(ConnectOutcome::Connected)
    }

    /// Ends the current session, if any.
    ///
    /// Background loops are cancelled, the write side is shut down, and a
    /// single `ConnectionStatusChanged(false)` is published. An in-flight
    /// [`connect`](Self::connect) is aborted.
    pub async fn disconnect(&self) {
        let session = {
            let mut shared = self.inner.shared.lock();
            if shared.state == ConnectionState::Disconnected {
                return;
            }
            shared.epoch += 1;
            shared.transition(ConnectionState::Disconnected, &self.inner.events);
            shared.session.take()
        };

        if let Some(session) = session {
            session.handle.shutdown.cancel();
            let mut writer = session.handle.writer.lock().await;
            let _ = writer.shutdown().await;

            #[cfg(feature = "tracing")]
            tracing::info!(peer = %session.peer, "Disconnected");
        }
    }

    /// Writes `bytes` to the server. Returns whether they were written.
    ///
    /// A write fault ends the session.
    pub async fn send_request(&self, bytes: &[u8]) -> bool {
        let Some(handle) = self.inner.current_handle() else {
            return false;
        };
        self.inner.write(&handle, bytes).await
    }

    /// Asks the server for one record.
    pub async fn request_record(&self) -> bool {
        self.send_request(&[TRIGGER]).await
    }

    /// Starts sending one trigger byte every `interval` for as long as the
    /// current session lasts.
    ///
    /// Returns `false` if there is no session or a request loop is already
    /// running.
    pub fn start_requesting(&self, interval: Duration) -> bool {
        let mut shared = self.inner.shared.lock();
        let Some(session) = shared.session.as_mut() else {
            return false;
        };
        if session.requests.as_ref().is_some_and(|t| !t.is_cancelled()) {
            return false;
        }

        let stop = session.handle.shutdown.child_token();
        session.requests = Some(stop.clone());
        tokio::spawn(tasks::request_loop(
            Arc::clone(&self.inner),
            session.handle.clone(),
            stop,
            interval,
        ));

        #[cfg(feature = "tracing")]
        tracing::debug!(?interval, "Request loop started");

        true
    }

    pub fn stop_requesting(&self) {
        let mut shared = self.inner.shared.lock();
        if let Some(stop) = shared.session.as_mut().and_then(|s| s.requests.take()) {
            stop.cancel();
        }
    }

    pub fn is_requesting(&self) -> bool {
        self.inner
            .shared
            .lock()
            .session
            .as_ref()
            .and_then(|s| s.requests.as_ref())
            .is_some_and(|t| !t.is_cancelled())
    }

    /// Registers a new event listener. Events published before this call are
    /// not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Remote address of the current session.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.inner.shared.lock().session.as_ref().map(|s| s.peer)
    }
}

impl Default for StreamClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        if let Some(session) = self.inner.shared.lock().session.take() {
            session.handle.shutdown.cancel();
        }
    }
}

/// An in-flight connect attempt. Unless disarmed on success, dropping it
/// returns the client to `Disconnected`, including when the caller drops the
/// `connect` future before it finishes.
struct PendingConnect<'a> {
    inner: &'a ClientInner,
    attempt: u64,
    armed: bool,
}

impl Drop for PendingConnect<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.fail_connect(self.attempt);
        }
    }
}

impl ClientInner {
    fn fail_connect(&self, attempt: u64) {
        let mut shared = self.shared.lock();
        if shared.state == ConnectionState::Connecting && shared.epoch == attempt {
            shared.transition(ConnectionState::Disconnected, &self.events);
        }
    }

    fn current_handle(&self) -> Option<SessionHandle> {
        self.shared
            .lock()
            .session
            .as_ref()
            .map(|s| s.handle.clone())
    }

    pub(crate) fn is_current(&self, id: u64) -> bool {
        self.shared.lock().current(id).is_some()
    }

    pub(crate) fn publish(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    /// Republishes `true` if session `id` is still the live one.
    pub(crate) fn confirm_alive(&self, id: u64) {
        let shared = self.shared.lock();
        if shared.current(id).is_some() && shared.state == ConnectionState::Connected {
            self.publish(ClientEvent::ConnectionStatusChanged(true));
        }
    }

    /// Tears down session `id` after a fault. Returns `false` if that session
    /// was already gone.
    pub(crate) fn end_session(&self, id: u64) -> bool {
        let session = {
            let mut shared = self.shared.lock();
            if shared.current(id).is_none() {
                return false;
            }
            shared.epoch += 1;
            shared.transition(ConnectionState::Disconnected, &self.events);
            shared.session.take()
        };

        if let Some(session) = session {
            session.handle.shutdown.cancel();

            #[cfg(feature = "tracing")]
            tracing::warn!(peer = %session.peer, "Connection lost");
        }
        true
    }

    /// Best-effort write on session `handle`. A fault ends the session.
    pub(crate) async fn write(&self, handle: &SessionHandle, bytes: &[u8]) -> bool {
        let written = tokio::select! {
            biased;
            () = handle.shutdown.cancelled() => return false,
            written = async {
                let mut writer = handle.writer.lock().await;
                writer.write_all(bytes).await?;
                writer.flush().await
            } => written,
        };

        match written {
            Ok(()) => true,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(session = handle.id, "Write failed: {_e}");

                self.end_session(handle.id);
                false
            }
        }
    }
}
