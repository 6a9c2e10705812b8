//! Error types for the record streaming client and server.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure of the wire protocol and of the connection lifecycle.
//!
//! ## Error Cases
//! - `Bind`: the server could not bind its listening socket.
//! - `ConnectTimeout` / `Connect` / `ConnectInProgress` / `ConnectAborted`:
//!   outcomes of the client's initial connect.
//! - `Disconnected`: a session was lost after it had been established.
//! - `Serialization` / `UnsupportedVersion` / `EmptyFrame`: a frame could not
//!   be encoded or decoded.
//! - `Io`: any other transport failure.
//!
//! Faults after a session is established never escape the client or server
//! as errors. They end the affected loop or handler and surface as a
//! connection status change instead.

use core::time::Duration;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for record streaming.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The listening socket could not be bound.
    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    /// The connect attempt did not finish within the connect timeout.
    #[error("Connection timeout: unable to connect to {addr} within {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// The connect attempt failed at the transport level.
    #[error("Connection error: unable to connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// Another connect attempt on the same client has not finished yet.
    #[error("A connection attempt is already in progress")]
    ConnectInProgress,

    /// `disconnect` was called while the connect attempt was in flight.
    #[error("Connection attempt aborted by disconnect")]
    ConnectAborted,

    /// An established session was lost.
    #[error("Peer disconnected")]
    Disconnected,

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    /// A frame was tagged with a wire version this build does not speak.
    #[error("Unsupported wire version {version}")]
    UnsupportedVersion { version: u8 },

    /// A frame carried no payload at all.
    #[error("Empty frame")]
    EmptyFrame,

    /// Any other transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
