//! Configuration constants and tunables for the streaming client and server.
//!
//! Default timings: a 10 second connect timeout, a 100 ms receive poll, a 3
//! second keepalive with a 1 ms readability probe, and a 2 second request
//! cadence.
//!
//! ## Key Concepts
//! - **Polling**: the client's receive loop drains the socket on a fixed
//!   cadence instead of parking on a read, so it can share the connection
//!   lock with the keepalive probe.
//! - **Bounded waits**: every wait in every loop is raced against the
//!   session's cancellation token, so disconnects are observed within one
//!   interval.
//! - **Framing**: frames larger than `max_frame_length` are rejected by the
//!   codec before any payload is decoded.

use core::time::Duration;

/// Upper bound for a single encoded frame (excluding the length prefix).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

/// How long `connect` waits for the TCP handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Cadence of the client's receive loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cadence of the client's keepalive loop.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(3);

/// How long a keepalive readability probe waits before declaring the peer
/// quiet (and therefore alive).
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1);

/// Cadence of the optional request loop.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(2);

/// Capacity of the client's event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// How long `stop` waits for connection handlers to finish.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Size of the server's per-connection read buffer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Tunables for [`StreamServer`](crate::StreamServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_frame_length: usize,
    pub shutdown_timeout: Duration,
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

/// Tunables for [`StreamClient`](crate::StreamClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub poll_interval: Duration,
    pub keepalive_interval: Duration,
    pub probe_timeout: Duration,
    pub max_frame_length: usize,
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
