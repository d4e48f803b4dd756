use altruist_core::Packet;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// A packet plus its type discriminator, as carried on the wire.
///
/// `payload` is kept as `serde_json::Value` regardless of wire format, so
/// one `Envelope` type serves both. The JSON format writes it as-is.
/// `serde_json::Value`'s `Deserialize` impl goes through `deserialize_any`,
/// which bincode (non-self-describing) can't support, so the binary format
/// doesn't derive `bincode::serialize`/`deserialize` on `Envelope` directly
/// — see [`Envelope::to_binary`]/[`Envelope::from_binary`], which carry the
/// payload as a self-describing JSON blob inside the bincode frame instead.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub packet_type: String,
    pub payload: serde_json::Value,
}

/// The bincode-friendly wire shape for [`Envelope`]: `payload` is carried
/// pre-serialized to JSON bytes instead of a bare `serde_json::Value`,
/// since bincode can only decode self-describing inner blobs, not a
/// `Value`'s `deserialize_any` calls.
#[derive(Serialize, Deserialize)]
struct BinaryEnvelope {
    packet_type: String,
    payload_json: Vec<u8>,
}

impl Envelope {
    /// Packs a concrete packet into an envelope tagged with its
    /// [`Packet::TYPE`].
    pub fn pack<P: Packet>(packet: &P) -> Result<Self, CodecError> {
        Ok(Self {
            packet_type: P::TYPE.to_owned(),
            payload: serde_json::to_value(packet)?,
        })
    }

    /// Unpacks the payload as `P`, rejecting a type mismatch before even
    /// attempting to deserialize the payload shape.
    pub fn unpack<P: Packet>(&self) -> Result<P, CodecError> {
        if self.packet_type != P::TYPE {
            return Err(CodecError::TypeMismatch {
                expected: P::TYPE,
                actual: self.packet_type.clone(),
            });
        }
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    /// Encodes this envelope for the binary wire format: the payload is
    /// flattened to JSON bytes first so the outer `bincode` frame never has
    /// to decode a bare `serde_json::Value`.
    pub(crate) fn to_binary(&self) -> Result<Vec<u8>, CodecError> {
        let wire = BinaryEnvelope {
            packet_type: self.packet_type.clone(),
            payload_json: serde_json::to_vec(&self.payload)?,
        };
        Ok(bincode::serialize(&wire)?)
    }

    /// Inverse of [`Envelope::to_binary`].
    pub(crate) fn from_binary(bytes: &[u8]) -> Result<Self, CodecError> {
        let wire: BinaryEnvelope = bincode::deserialize(bytes)?;
        Ok(Self {
            packet_type: wire.packet_type,
            payload: serde_json::from_slice(&wire.payload_json)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use altruist_core::packet::SuccessPacket;

    #[test]
    fn binary_round_trip_preserves_packet_type_and_payload() {
        let envelope = Envelope::pack(&SuccessPacket {
            message: "hi".to_owned(),
        })
        .unwrap();

        let bytes = envelope.to_binary().unwrap();
        let decoded = Envelope::from_binary(&bytes).unwrap();

        assert_eq!(decoded.packet_type, envelope.packet_type);
        let packet: SuccessPacket = decoded.unpack().unwrap();
        assert_eq!(packet.message, "hi");
    }
}
