//! `Connection` and the identifiers that key it.
//!
//! A [`Connection`] is created on transport accept and destroyed on close.
//! Exactly one process holds the local socket handle for a given
//! [`ClientId`] at a time; every other process that knows about the
//! connection (via the Redis-backed store) holds a read-only shadow with no
//! handle at all — see [`Connection::is_local`].

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque, stable client identifier. Cheap to clone (interned as an `Arc<str>`).
#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ClientId(Arc<str>);

impl ClientId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifies the process that owns a [`Connection`]'s socket.
///
/// Used as the loop-prevention tag on [`InterprocessPacket`](crate::packet::InterprocessPacket):
/// a process never re-delivers a message it originated.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ProcessId(uuid::Uuid);

impl ProcessId {
    /// Generates a new random process identity. Called once at startup.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// The sentinel used by a document that predates process-id tagging.
    /// Ingress treats this the same as "foreign" (never skip-self on it).
    pub fn nil() -> Self {
        Self(uuid::Uuid::nil())
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

/// The transport a [`Connection`] arrived over.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum TransportKind {
    WebSocket,
    Udp,
    Tcp,
}

/// Connection lifecycle state, advanced by the network layer and portals as
/// a client progresses from handshake to room membership.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum ConnectionState {
    Handshaking = 0,
    Authenticated = 1,
    Joined = 2,
    Closing = 3,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Handshaking,
            1 => Self::Authenticated,
            2 => Self::Joined,
            _ => Self::Closing,
        }
    }
}

/// Error returned by [`OutboundHandle::try_send`].
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The connection's outbound queue is full or closed.
    #[error("connection closed")]
    Closed,
}

/// The write side of a locally owned socket.
///
/// `altruist_network` implements this over its per-connection byte channel;
/// `altruist_core` only needs the seam so that a [`Connection`] can be
/// constructed without this crate depending on the transport layer.
pub trait OutboundHandle: Send + Sync {
    /// Enqueues a fully encoded frame for delivery. Never blocks.
    fn try_send(&self, frame: bytes::Bytes) -> Result<(), SendError>;

    /// Whether the underlying socket is still open.
    fn is_connected(&self) -> bool;

    /// Tears down the underlying socket. Used on process shutdown to close
    /// every locally owned connection; idempotent.
    fn close(&self);
}

/// A client connection.
///
/// `handle` is `Some` only on the process that locally owns the socket.
/// Connections recovered from the Redis-backed store on a peer process are
/// read-only shadows (`handle: None`) used only to answer "does this client
/// exist" queries for routing purposes.
pub struct Connection {
    id: ClientId,
    transport: TransportKind,
    owner_process_id: ProcessId,
    state: AtomicU8,
    handle: Option<Arc<dyn OutboundHandle>>,
}

impl Connection {
    pub fn new_local(
        id: ClientId,
        transport: TransportKind,
        owner_process_id: ProcessId,
        handle: Arc<dyn OutboundHandle>,
    ) -> Self {
        Self {
            id,
            transport,
            owner_process_id,
            state: AtomicU8::new(ConnectionState::Handshaking as u8),
            handle: Some(handle),
        }
    }

    /// Builds a read-only shadow: a `Connection` known to exist (e.g. via the
    /// Redis-backed store) but whose socket lives on another process.
    pub fn new_shadow(id: ClientId, transport: TransportKind, owner_process_id: ProcessId) -> Self {
        Self {
            id,
            transport,
            owner_process_id,
            state: AtomicU8::new(ConnectionState::Handshaking as u8),
            handle: None,
        }
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn owner_process_id(&self) -> ProcessId {
        self.owner_process_id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Whether this process holds the socket handle for this connection.
    pub fn is_local(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_connected(&self) -> bool {
        match &self.handle {
            Some(h) => h.is_connected(),
            None => false,
        }
    }

    /// Writes a pre-encoded frame directly to the socket. Only valid for a
    /// locally owned connection; returns `SendError::Closed` for a shadow.
    pub fn try_send(&self, frame: bytes::Bytes) -> Result<(), SendError> {
        match &self.handle {
            Some(h) => h.try_send(frame),
            None => Err(SendError::Closed),
        }
    }

    /// Closes the locally owned socket, if any. A no-op on a shadow.
    pub fn close(&self) {
        if let Some(h) = &self.handle {
            h.close();
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("transport", &self.transport)
            .field("owner_process_id", &self.owner_process_id)
            .field("state", &self.state())
            .field("is_local", &self.is_local())
            .finish()
    }
}
