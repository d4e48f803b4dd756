//! The error taxonomy described in the design's error-handling section.
//!
//! Only [`AltruistError::Config`] and [`AltruistError::FatalInternal`]
//! terminate the process; every other variant is recovered locally by the
//! component that produced it (see each variant's doc comment for who is
//! expected to catch it).

use crate::connection::ClientId;

/// The error taxonomy shared across the workspace.
///
/// Variants carry enough context to satisfy the logging requirements placed
/// on them without the caller needing to re-derive it (packet type, client
/// id, and the underlying cause where one exists).
#[derive(Debug, thiserror::Error)]
pub enum AltruistError {
    /// Invalid or missing registration, surfaced at startup. Aborts.
    #[error("configuration error: {0}")]
    Config(String),

    /// A socket or Redis operation timed out or was otherwise transient.
    /// Recovered via the reconnect policy; never surfaced to a caller as
    /// fatal.
    #[error("transient I/O error: {0}")]
    TransientIo(#[source] anyhow::Error),

    /// A malformed inbound frame. The frame is dropped and the connection
    /// continues.
    #[error("failed to decode packet{}: {reason}", client.as_ref().map(|c| format!(" from {c}")).unwrap_or_default())]
    Decode {
        reason: String,
        client: Option<ClientId>,
    },

    /// No handler is registered for this packet's type discriminator.
    /// Logged once per type and dropped.
    #[error("no portal handler registered for packet type {packet_type:?}")]
    DispatchMiss { packet_type: String },

    /// A portal method returned an error. Logged with packet type and
    /// client id; the connection is left open.
    #[error("handler error for packet type {packet_type:?} from {client}: {source}")]
    Handler {
        packet_type: String,
        client: ClientId,
        #[source]
        source: anyhow::Error,
    },

    /// Unrecoverable process state (e.g. the tick thread panicked). The
    /// process is expected to exit with a non-zero status after this is
    /// logged.
    #[error("fatal internal error: {0}")]
    FatalInternal(String),
}

impl AltruistError {
    /// Whether this error should terminate the process once handled.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::FatalInternal(_))
    }
}
