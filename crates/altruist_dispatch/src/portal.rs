use altruist_core::ClientId;
use altruist_protocol::Envelope;
use async_trait::async_trait;

/// A handler for one packet type.
///
/// [`Portal::gate`] is the type discriminator this portal answers for —
/// matching a concrete packet's `Packet::TYPE` — registered with
/// [`crate::PortalDispatcher::register`] at startup, not discovered by
/// scanning annotations the way the original reflection-based registry
/// did.
#[async_trait]
pub trait Portal: Send + Sync {
    fn gate(&self) -> &str;

    /// Handles one decoded packet. An `Err` is logged with the packet type
    /// and client id and the connection is left open; it never tears down
    /// the connection on its own.
    async fn handle(&self, envelope: &Envelope, client: ClientId) -> anyhow::Result<()>;
}
