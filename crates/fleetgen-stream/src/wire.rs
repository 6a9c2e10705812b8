//! # Record Frames
//!
//! Every record travels as one length-prefixed frame:
//!
//! ```text
//! +----------------+---------+---------------------------+
//! | length: u32 BE | version | bincode(ParentRecord)     |
//! +----------------+---------+---------------------------+
//! ```
//!
//! The length prefix makes several records over one stream unambiguous. The
//! version byte lets a decoder refuse payloads it does not understand instead
//! of misreading them. The payload is decoded with a size limit equal to the
//! frame limit and trailing bytes are rejected.
//!
//! Requests in the other direction are unframed: each byte a client sends asks
//! for one record, and its value is ignored.

use crate::error::{Error, Result};
use bincode::Options;
use bytes::{Bytes, BytesMut};
use fleetgen::ParentRecord;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Version tag written as the first payload byte.
pub const WIRE_VERSION: u8 = 1;

/// Conventional request byte. Any value is accepted by the server.
pub const TRIGGER: u8 = 0x01;

/// Size of the length prefix in bytes.
pub const LENGTH_FIELD_LEN: usize = 4;

fn payload_options(limit: usize) -> impl Options {
    bincode::DefaultOptions::new().with_limit(limit as u64)
}

/// Serializes `record` into a frame payload (version byte + body).
pub fn encode_record(record: &ParentRecord, max_frame_length: usize) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(64);
    payload.push(WIRE_VERSION);
    payload_options(max_frame_length.saturating_sub(1)).serialize_into(&mut payload, record)?;
    Ok(payload)
}

/// Parses a frame payload produced by [`encode_record`].
pub fn decode_record(payload: &[u8], max_frame_length: usize) -> Result<ParentRecord> {
    let (&version, body) = payload.split_first().ok_or(Error::EmptyFrame)?;
    if version != WIRE_VERSION {
        return Err(Error::UnsupportedVersion { version });
    }
    Ok(payload_options(max_frame_length).deserialize(body)?)
}

/// A [`Decoder`]/[`Encoder`] pair for [`ParentRecord`] frames.
///
/// Framing is delegated to [`LengthDelimitedCodec`] with a 4-byte big-endian
/// prefix; this codec only adds the versioned payload on top.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    frames: LengthDelimitedCodec,
    max_frame_length: usize,
}

impl RecordCodec {
    pub fn new(max_frame_length: usize) -> Self {
        let frames = LengthDelimitedCodec::builder()
            .length_field_length(LENGTH_FIELD_LEN)
            .big_endian()
            .max_frame_length(max_frame_length)
            .new_codec();

        Self {
            frames,
            max_frame_length,
        }
    }

    pub const fn max_frame_length(&self) -> usize {
        self.max_frame_length
    }
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl Decoder for RecordCodec {
    type Item = ParentRecord;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ParentRecord>> {
        match self.frames.decode(src)? {
            Some(frame) => decode_record(&frame, self.max_frame_length).map(Some),
            None => Ok(None),
        }
    }
}

impl Encoder<ParentRecord> for RecordCodec {
    type Error = Error;

    fn encode(&mut self, record: ParentRecord, dst: &mut BytesMut) -> Result<()> {
        let payload = encode_record(&record, self.max_frame_length)?;
        dst.reserve(LENGTH_FIELD_LEN + payload.len());
        self.frames.encode(Bytes::from(payload), dst)?;
        Ok(())
    }
}

/// Writes a raw frame around an arbitrary payload. Only used to build
/// malformed input in tests.
#[cfg(test)]
pub(crate) fn raw_frame(payload: &[u8]) -> BytesMut {
    use bytes::BufMut;

    let mut frame = BytesMut::with_capacity(LENGTH_FIELD_LEN + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetgen::{Category, factory};
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn back_to_back_frames_decode_in_order() {
        let mut rng = StdRng::seed_from_u64(11);
        let records: Vec<_> = (0..5).map(|_| factory::parent_record(&mut rng)).collect();

        let mut codec = RecordCodec::default();
        let mut stream = BytesMut::new();
        for record in &records {
            codec.encode(record.clone(), &mut stream).unwrap();
        }

        let mut decoded = Vec::new();
        while let Some(record) = codec.decode(&mut stream).unwrap() {
            decoded.push(record);
        }
        assert_eq!(decoded, records);
        assert!(stream.is_empty());
    }

    #[test]
    fn identity_survives_the_wire() {
        let record = ParentRecord::new("Honda", "Model Y", 130, 190, Category::Passenger);
        let payload = encode_record(&record, 1024).unwrap();
        let decoded = decode_record(&payload, 1024).unwrap();
        assert_eq!(decoded.id(), record.id());
        assert_eq!(decoded, record);
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let record = ParentRecord::new("Ford", "Classic", 100, 150, Category::Truck);
        let mut codec = RecordCodec::default();
        let mut full = BytesMut::new();
        codec.encode(record.clone(), &mut full).unwrap();

        let mut partial = full.split_to(full.len() - 3);
        assert!(codec.decode(&mut partial).unwrap().is_none());
        partial.unsplit(full);
        assert_eq!(codec.decode(&mut partial).unwrap(), Some(record));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let record = ParentRecord::new("Kia", "Sport", 250, 220, Category::Passenger);
        let mut payload = encode_record(&record, 1024).unwrap();
        payload[0] = WIRE_VERSION + 1;

        let mut src = raw_frame(&payload);
        let err = RecordCodec::default().decode(&mut src).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version } if version == WIRE_VERSION + 1));
    }

    #[test]
    fn empty_and_truncated_payloads_are_rejected() {
        let mut codec = RecordCodec::default();
        assert!(matches!(
            codec.decode(&mut raw_frame(&[])).unwrap_err(),
            Error::EmptyFrame
        ));
        assert!(matches!(
            codec.decode(&mut raw_frame(&[WIRE_VERSION, 0xff])).unwrap_err(),
            Error::Serialization { .. }
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let record = ParentRecord::new("BMW", "Model X", 400, 280, Category::Passenger);
        let mut payload = encode_record(&record, 1024).unwrap();
        payload.push(0);
        assert!(matches!(
            decode_record(&payload, 1024).unwrap_err(),
            Error::Serialization { .. }
        ));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut codec = RecordCodec::new(16);
        let mut src = raw_frame(&[0u8; 32]);
        assert!(matches!(codec.decode(&mut src).unwrap_err(), Error::Io(_)));

        let record = ParentRecord::new("Volkswagen", "Premium", 100, 150, Category::Truck);
        let mut dst = BytesMut::new();
        assert!(codec.encode(record, &mut dst).is_err());
    }
}
