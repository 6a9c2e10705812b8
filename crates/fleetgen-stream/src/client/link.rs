use crate::{error::Error, wire::RecordCodec};
use bytes::BytesMut;
use core::time::Duration;
use fleetgen::ParentRecord;
use std::io;
use tokio::net::tcp::OwnedReadHalf;
use tokio_util::codec::Decoder;

const READ_CHUNK: usize = 4 * 1024;

/// Read side of a client session: the socket half plus whatever partial frame
/// is still buffered.
pub(crate) struct Link {
    reader: OwnedReadHalf,
    buffer: BytesMut,
    codec: RecordCodec,
    // Soft cap on bytes buffered per drain; the rest is picked up next tick.
    drain_limit: usize,
}

pub(crate) struct Drained {
    pub(crate) records: Vec<ParentRecord>,
    pub(crate) closed: bool,
    pub(crate) fault: Option<Error>,
}

impl Link {
    pub(crate) fn new(reader: OwnedReadHalf, max_frame_length: usize) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            codec: RecordCodec::new(max_frame_length),
            drain_limit: max_frame_length.saturating_mul(4).max(READ_CHUNK),
        }
    }

    /// Reads everything available without waiting and decodes every complete
    /// frame. Frames buffered ahead of a close or a read fault are still
    /// returned.
    pub(crate) fn drain(&mut self) -> Drained {
        let mut closed = false;
        let mut fault = None;
        while self.buffer.len() < self.drain_limit {
            self.buffer.reserve(READ_CHUNK);
            match self.reader.try_read_buf(&mut self.buffer) {
                Ok(0) => {
                    closed = true;
                    break;
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    fault = Some(Error::from(e));
                    break;
                }
            }
        }

        let mut records = Vec::new();
        loop {
            match self.codec.decode(&mut self.buffer) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => break,
                Err(e) => {
                    fault.get_or_insert(e);
                    break;
                }
            }
        }

        Drained {
            records,
            closed,
            fault,
        }
    }

    /// Checks whether the peer is still there.
    ///
    /// Waits up to `wait` for the socket to become readable. Nothing to read
    /// means the peer is quiet but alive; a readable socket with zero bytes
    /// means it closed.
    pub(crate) async fn probe(&mut self, wait: Duration) -> bool {
        let mut byte = [0_u8; 1];
        match tokio::time::timeout(wait, self.reader.peek(&mut byte)).await {
            Err(_elapsed) => true,
            Ok(Ok(0)) | Ok(Err(_)) => false,
            Ok(Ok(_)) => true,
        }
    }
}
