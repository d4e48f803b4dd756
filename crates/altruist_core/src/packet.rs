//! Packet header and the well-known packet payloads from the wire-format
//! section of the design.
//!
//! Concrete payloads are plain `serde`-derived structs; [`Packet::TYPE`] is
//! the string discriminator carried in the header's `type` field at the wire
//! level (see `altruist_protocol` for the codec that puts the two together).

use serde::{Deserialize, Serialize};

use crate::connection::{ClientId, ProcessId};

/// Types considered to be Altruist packets.
///
/// A `Packet` only ever describes the payload; the discriminator used to
/// route a decoded frame to a handler is [`Packet::TYPE`], not the Rust type
/// name, so renaming a struct never changes the wire format.
pub trait Packet: Serialize + for<'de> Deserialize<'de> + std::fmt::Debug {
    /// The wire-level type discriminator, e.g. `"SyncPacket"`.
    const TYPE: &'static str;
}

/// Packet header: `{timestamp, sender, receiver?}` plus the type
/// discriminator, shared by every packet on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PacketHeader {
    /// Milliseconds since the UTC epoch.
    pub timestamp: i64,
    pub sender: String,
    pub receiver: Option<String>,
}

impl PacketHeader {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            timestamp: now_millis(),
            sender: sender.into(),
            receiver: None,
        }
    }

    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    pub fn from_server() -> Self {
        Self::new("server")
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A minimal 3-component position, used only by [`JoinGamePacket`]. A full
/// vector-math crate is not worth pulling in for three floats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A server-authoritative delta for one entity: the changed property names
/// and their new values, produced by `altruist_sync::SyncEngine`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncPacket {
    pub entity_type: String,
    pub data: std::collections::BTreeMap<String, serde_json::Value>,
}

impl Packet for SyncPacket {
    const TYPE: &'static str = "SyncPacket";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinGamePacket {
    pub name: String,
    pub room_id: Option<String>,
    pub position: Option<Position>,
    pub world_index: Option<i32>,
}

impl Packet for JoinGamePacket {
    const TYPE: &'static str = "JoinGamePacket";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaveGamePacket {
    pub client_id: String,
}

impl Packet for LeaveGamePacket {
    const TYPE: &'static str = "LeaveGamePacket";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomPacket {
    pub id: String,
    pub max_capacity: usize,
    pub connection_ids: Vec<String>,
}

impl Packet for RoomPacket {
    const TYPE: &'static str = "RoomPacket";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandshakePacket {
    pub rooms: Vec<RoomPacket>,
}

impl Packet for HandshakePacket {
    const TYPE: &'static str = "HandshakePacket";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuccessPacket {
    pub message: String,
}

impl Packet for SuccessPacket {
    const TYPE: &'static str = "SuccessPacket";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FailedPacket {
    pub reason: String,
}

impl Packet for FailedPacket {
    const TYPE: &'static str = "FailedPacket";
}

/// Wraps an encoded packet for transit across the Redis backplane.
///
/// `process_id` is the loop-prevention tag: a process skips any
/// `InterprocessPacket` whose `process_id` matches its own, since that means
/// the message is an echo of something it produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterprocessPacket {
    pub process_id: ProcessId,
    pub header: PacketHeader,
    /// The packet type discriminator of `inner_packet`.
    pub inner_type: String,
    /// The inner packet, pre-serialized by the sender's codec. Kept opaque
    /// here so this crate doesn't need to know every concrete packet type
    /// that might cross the backplane.
    pub inner_packet: serde_json::Value,
}

impl InterprocessPacket {
    pub fn new(process_id: ProcessId, header: PacketHeader, inner_type: impl Into<String>, inner_packet: serde_json::Value) -> Self {
        Self {
            process_id,
            header,
            inner_type: inner_type.into(),
            inner_packet,
        }
    }

    /// Whether this packet originated from `self_id` and should therefore
    /// never be redelivered locally (the skip-self rule).
    pub fn originated_from(&self, self_id: ProcessId) -> bool {
        self.process_id == self_id
    }
}

#[allow(unused)]
pub(crate) fn _assert_client_id_usable(_: ClientId) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_packet_round_trips_through_json() {
        let pkt = SuccessPacket {
            message: "hi".to_owned(),
        };
        let json = serde_json::to_string(&pkt).unwrap();
        let back: SuccessPacket = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message, "hi");
    }

    #[test]
    fn interprocess_packet_skip_self_rule() {
        let a = ProcessId::generate();
        let b = ProcessId::generate();
        let header = PacketHeader::new("A");
        let ipp = InterprocessPacket::new(a, header, "SuccessPacket", serde_json::json!({"message": "x"}));
        assert!(ipp.originated_from(a));
        assert!(!ipp.originated_from(b));
    }
}
