use std::sync::Arc;

use altruist_core::{ClientId, Packet};
use altruist_protocol::Envelope;
use altruist_store::ConnectionStore;

use crate::router::client::ClientSender;

/// `send(packet, exclude?)`: fans out to every locally known connection.
///
/// Packets are immutable values; rather than mutating a shared packet's
/// header per recipient, each delivery just addresses a fresh
/// `(recipient, envelope)` pair at the `ClientSender` call site (Design
/// Notes "Struct-packets with mutable headers").
#[derive(Clone)]
pub struct BroadcastSender {
    client: Arc<dyn ClientSender>,
    store: Arc<ConnectionStore>,
}

impl BroadcastSender {
    pub fn new(client: Arc<dyn ClientSender>, store: Arc<ConnectionStore>) -> Self {
        Self { client, store }
    }

    pub async fn send<P: Packet + Sync>(&self, packet: &P, exclude: Option<&ClientId>) {
        let envelope = match Envelope::pack(packet) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(packet_type = P::TYPE, error = %e, "failed to pack outgoing packet");
                return;
            }
        };
        self.send_envelope(&envelope, exclude).await;
    }

    pub(crate) async fn send_envelope(&self, envelope: &Envelope, exclude: Option<&ClientId>) {
        for conn in self.store.get_all_connections() {
            if exclude.is_some_and(|excluded| excluded == conn.id()) {
                continue;
            }
            self.client.send_envelope(conn.id(), envelope.clone()).await;
        }
    }
}
