use crate::{config::ServerConfig, error::Result, wire::RecordCodec};
use fleetgen::{ParentRecord, factory};
use futures::SinkExt;
use parking_lot::Mutex;
use rand::{SeedableRng, rngs::StdRng};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpStream, tcp::OwnedWriteHalf};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;

/// Set of connections a server is currently serving.
#[derive(Debug, Default)]
pub(crate) struct ConnectionTable {
    next_id: AtomicU64,
    peers: Mutex<HashMap<u64, SocketAddr>>,
}

impl ConnectionTable {
    pub(crate) fn track(self: &Arc<Self>, peer: SocketAddr) -> TrackedConnection {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.peers.lock().insert(id, peer);
        TrackedConnection {
            id,
            peer,
            table: Arc::clone(self),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.peers.lock().len()
    }
}

/// Membership of one connection in a [`ConnectionTable`]. Dropping it removes
/// the connection, whichever way its handler exits.
pub(crate) struct TrackedConnection {
    id: u64,
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    peer: SocketAddr,
    table: Arc<ConnectionTable>,
}

impl Drop for TrackedConnection {
    fn drop(&mut self) {
        self.table.peers.lock().remove(&self.id);
    }
}

/// Serves one accepted connection until the peer leaves, a fault occurs, or
/// the server shuts down.
///
/// Faults are logged and swallowed: a broken connection only ends its own
/// handler.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    conn: TrackedConnection,
    shutdown: CancellationToken,
    config: ServerConfig,
) {
    #[cfg(feature = "tracing")]
    tracing::debug!(peer = %conn.peer, conn = conn.id, "Connection accepted");

    match serve(stream, &shutdown, &config).await {
        Ok(()) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(peer = %conn.peer, conn = conn.id, "Connection closed");
        }
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(peer = %conn.peer, conn = conn.id, "Connection dropped: {_e}");
        }
    }
    drop(conn);
}

async fn serve(stream: TcpStream, shutdown: &CancellationToken, config: &ServerConfig) -> Result<()> {
    // Frames are small and latency matters more than packet count.
    stream.set_nodelay(true)?;
    let (mut reader, writer) = stream.into_split();
    let mut frames = FramedWrite::new(writer, RecordCodec::new(config.max_frame_length));
    let mut rng = StdRng::from_rng(&mut rand::rng());
    let mut buf = vec![0_u8; config.read_buffer_size.max(1)];

    loop {
        let read = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Ok(()),
            read = reader.read(&mut buf) => read?,
        };

        if read == 0 {
            return Ok(());
        }

        // One record per trigger byte.
        tokio::select! {
            biased;
            () = shutdown.cancelled() => return Ok(()),
            sent = send_records(&mut frames, &mut rng, read) => sent?,
        }
    }
}

async fn send_records(
    frames: &mut FramedWrite<OwnedWriteHalf, RecordCodec>,
    rng: &mut StdRng,
    count: usize,
) -> Result<()> {
    for _ in 0..count {
        let record: ParentRecord = factory::parent_record(rng);

        #[cfg(feature = "tracing")]
        tracing::trace!(id = %record.id(), brand = %record.brand, model = %record.model, "Sending record");

        frames.feed(record).await?;
    }
    frames.flush().await
}
