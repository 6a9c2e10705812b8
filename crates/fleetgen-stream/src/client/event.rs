use fleetgen::ParentRecord;

/// Notification published by a [`StreamClient`](crate::StreamClient).
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A complete record arrived from the server.
    RecordReceived(ParentRecord),
    /// The connection went up (`true`) or down (`false`). `true` is also
    /// republished by every successful keepalive probe.
    ConnectionStatusChanged(bool),
}

/// Where a client is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Successful result of [`StreamClient::connect`](crate::StreamClient::connect).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new session was established.
    Connected,
    /// The client was already connected; nothing changed.
    AlreadyConnected,
}
