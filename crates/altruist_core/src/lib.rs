//! Shared data model for Altruist.
//!
//! This crate has no knowledge of sockets, Redis, or the tick loop — it only
//! defines the vocabulary ([`Connection`], [`PacketHeader`], the well-known
//! packet payloads, and the [`AltruistError`] taxonomy) that every other
//! crate in the workspace builds on.

pub mod connection;
pub mod error;
pub mod packet;

pub use connection::{ClientId, Connection, ConnectionState, OutboundHandle, ProcessId, SendError, TransportKind};
pub use error::AltruistError;
pub use packet::{Packet, PacketHeader};
