//! Altruist: a realtime multiplayer game-server framework.
//!
//! A deployment builds an [`AppConfig`], assembles an [`Altruist`] from it,
//! registers its [`Portal`] handlers, and calls [`Altruist::start`]. Every
//! subsystem this crate wires together — the tick engine, the connection
//! store, the Redis backplane — lives in its own crate; this one is the
//! facade that turns them into one running process plus the [`Router`]
//! that portal code actually calls to send packets back out.

mod app;
mod backplane;
mod config;
mod egress;
mod error;
mod router;

pub use altruist_core::packet::{FailedPacket, HandshakePacket, JoinGamePacket, LeaveGamePacket, Position, RoomPacket, SuccessPacket, SyncPacket};
pub use altruist_core::{ClientId, Connection, ConnectionState, Packet, PacketHeader, ProcessId, TransportKind};
pub use altruist_dispatch::{Portal, PortalDispatcher};
pub use altruist_protocol::Envelope;
pub use altruist_store::{ConnectionStore, Room};
pub use altruist_sync::{PropertyLayout, Synced, SyncEngine};
pub use altruist_tick::{TickEngine, TickEngineConfig};

#[cfg(feature = "redis")]
pub use altruist_redis::RedisBackplane;

pub use app::Altruist;
pub use backplane::RouterIngressSink;
pub use config::{AppConfig, CacheConfig, EngineConfig, EngineUnit, TransportConfig};
pub use egress::{Egress, NoEgress};
pub use error::{AltruistError, StartupError};
pub use router::{
    BroadcastSender, ClientSender, ClientSenderExt, ClientSynchronizator, DirectClientSender, DirectRouter, EngineClientSender, EngineRouter, RoomSender, Router,
};
