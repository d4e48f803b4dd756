use bytes::{Buf, BufMut, BytesMut};

use crate::envelope::Envelope;
use crate::error::CodecError;
use crate::{Format, MAX_FRAME_SIZE};

/// Frame layout: `[u32 len][u8 format][len - 1 bytes of encoded envelope]`.
const HEADER_LEN: usize = 4;

/// Accumulates encoded frames into a single buffer, ready to be written to a
/// socket with one `take()`.
#[derive(Default)]
pub struct PacketEncoder {
    buf: BytesMut,
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one packet, encoded in `format`, as a length-prefixed frame.
    pub fn append_packet<P: altruist_core::Packet>(&mut self, pkt: &P, format: Format) -> Result<(), CodecError> {
        let envelope = Envelope::pack(pkt)?;
        self.append_envelope(&envelope, format)
    }

    /// Appends an already-packed [`Envelope`]. Used by callers that only
    /// have the type-erased envelope (e.g. a router forwarding a packet it
    /// never deserializes into a concrete type).
    pub fn append_envelope(&mut self, envelope: &Envelope, format: Format) -> Result<(), CodecError> {
        let body = match format {
            Format::Binary => envelope.to_binary()?,
            Format::Json => serde_json::to_vec(envelope)?,
        };

        let frame_len = 1 + body.len();
        if frame_len > MAX_FRAME_SIZE {
            return Err(CodecError::TooLarge);
        }

        self.buf.put_u32(frame_len as u32);
        self.buf.put_u8(format.tag());
        self.buf.extend_from_slice(&body);

        Ok(())
    }

    /// Takes all frames appended so far, leaving the encoder empty.
    pub fn take(&mut self) -> BytesMut {
        self.buf.split()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Buffers inbound bytes and peels off complete frames as they arrive.
///
/// Bytes from the socket are pushed in with [`queue_bytes`](Self::queue_bytes);
/// [`try_next_frame`](Self::try_next_frame) returns `Ok(None)` when the
/// buffer doesn't yet hold a whole frame, which the caller takes as "wait
/// for more bytes", not an error.
#[derive(Default)]
pub struct PacketDecoder {
    buf: BytesMut,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_bytes(&mut self, bytes: BytesMut) {
        self.buf.unsplit(bytes);
    }

    pub fn queue_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Decodes the next complete frame, if one is buffered.
    pub fn try_next_frame(&mut self) -> Result<Option<Envelope>, CodecError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let frame_len = u32::from_be_bytes(self.buf[..HEADER_LEN].try_into().expect("checked length")) as usize;
        if frame_len > MAX_FRAME_SIZE {
            return Err(CodecError::TooLarge);
        }

        if self.buf.len() < HEADER_LEN + frame_len {
            return Ok(None);
        }

        self.buf.advance(HEADER_LEN);
        let frame = self.buf.split_to(frame_len);

        let format = Format::from_tag(frame[0])?;
        let body = &frame[1..];

        let envelope = match format {
            Format::Binary => Envelope::from_binary(body)?,
            Format::Json => serde_json::from_slice(body)?,
        };

        Ok(Some(envelope))
    }

    pub fn queued_bytes(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use altruist_core::packet::SuccessPacket;

    use super::*;

    #[test]
    fn rejects_oversized_frame_header() {
        let mut dec = PacketDecoder::new();
        let mut buf = BytesMut::new();
        buf.put_u32((MAX_FRAME_SIZE + 1) as u32);
        dec.queue_bytes(buf);
        assert!(matches!(dec.try_next_frame(), Err(CodecError::TooLarge)));
    }

    #[test]
    fn partial_body_waits_for_more_bytes() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(
            &SuccessPacket {
                message: "x".repeat(64),
            },
            Format::Json,
        )
        .unwrap();
        let mut full = enc.take();
        let partial = full.split_to(full.len() - 1);

        let mut dec = PacketDecoder::new();
        dec.queue_bytes(partial);
        assert!(dec.try_next_frame().unwrap().is_none());

        dec.queue_bytes(full);
        assert!(dec.try_next_frame().unwrap().is_some());
    }

    #[test]
    fn binary_frame_round_trips_through_encoder_and_decoder() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(
            &SuccessPacket {
                message: "welcome".to_owned(),
            },
            Format::Binary,
        )
        .unwrap();

        let mut dec = PacketDecoder::new();
        dec.queue_bytes(enc.take());
        let envelope = dec.try_next_frame().unwrap().expect("complete frame");

        let packet: SuccessPacket = envelope.unpack().unwrap();
        assert_eq!(packet.message, "welcome");
    }
}
