//! The packet codec.
//!
//! Two wire formats share one framing: a 4-byte big-endian length prefix
//! followed by a 1-byte format tag and the encoded [`Envelope`]. [`Format::Binary`]
//! encodes the envelope with `bincode`; [`Format::Json`] encodes it as UTF-8
//! JSON and is kept as the cross-language-compatible fallback the design
//! calls for. Either way `decode(encode(p)) == p` for every packet in the
//! well-known set.

mod codec;
mod envelope;
mod error;

pub use codec::{PacketDecoder, PacketEncoder};
pub use envelope::Envelope;
pub use error::CodecError;

/// Selects which of the two wire formats a [`PacketEncoder`] emits.
///
/// The binary format is preferred; JSON exists for peers that don't carry a
/// `bincode` decoder (browser clients talking over the same WebSocket).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    Binary,
    Json,
}

impl Format {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Format::Binary => 0,
            Format::Json => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Result<Self, CodecError> {
        match tag {
            0 => Ok(Format::Binary),
            1 => Ok(Format::Json),
            other => Err(CodecError::UnknownFormat(other)),
        }
    }
}

/// Frames above this size are rejected rather than buffered indefinitely.
pub const MAX_FRAME_SIZE: usize = 2 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use altruist_core::packet::{FailedPacket, SuccessPacket};
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn binary_round_trip() {
        let mut enc = PacketEncoder::new();
        let pkt = SuccessPacket {
            message: "welcome".to_owned(),
        };
        enc.append_packet(&pkt, Format::Binary).unwrap();

        let mut dec = PacketDecoder::new();
        dec.queue_bytes(enc.take());

        let envelope = dec.try_next_frame().unwrap().unwrap();
        let decoded: SuccessPacket = envelope.unpack().unwrap();
        assert_eq!(decoded.message, pkt.message);
    }

    #[test]
    fn json_round_trip() {
        let mut enc = PacketEncoder::new();
        let pkt = FailedPacket {
            reason: "room full".to_owned(),
        };
        enc.append_packet(&pkt, Format::Json).unwrap();

        let mut dec = PacketDecoder::new();
        dec.queue_bytes(enc.take());

        let envelope = dec.try_next_frame().unwrap().unwrap();
        let decoded: FailedPacket = envelope.unpack().unwrap();
        assert_eq!(decoded.reason, pkt.reason);
    }

    #[test]
    fn incomplete_frame_yields_none() {
        let mut dec = PacketDecoder::new();
        dec.queue_bytes(BytesMut::from(&[0u8, 0, 0, 10][..]));
        assert!(dec.try_next_frame().unwrap().is_none());
    }

    #[test]
    fn two_frames_in_one_buffer_decode_in_order() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(
            &SuccessPacket {
                message: "first".to_owned(),
            },
            Format::Binary,
        )
        .unwrap();
        enc.append_packet(
            &SuccessPacket {
                message: "second".to_owned(),
            },
            Format::Json,
        )
        .unwrap();

        let mut dec = PacketDecoder::new();
        dec.queue_bytes(enc.take());

        let first: SuccessPacket = dec.try_next_frame().unwrap().unwrap().unpack().unwrap();
        let second: SuccessPacket = dec.try_next_frame().unwrap().unwrap().unpack().unwrap();
        assert_eq!(first.message, "first");
        assert_eq!(second.message, "second");
        assert!(dec.try_next_frame().unwrap().is_none());
    }
}
