use std::sync::Arc;

use altruist_core::Packet;
use altruist_protocol::Envelope;
use altruist_store::ConnectionStore;
use tracing::trace;

use crate::router::client::ClientSender;

/// `send(roomId, packet)`: looks up the room, fans out to every member via
/// [`ClientSender`]. A room that doesn't exist is a silent no-op, same as
/// sending to an absent connection.
pub struct RoomSender {
    client: Arc<dyn ClientSender>,
    store: Arc<ConnectionStore>,
}

impl RoomSender {
    pub fn new(client: Arc<dyn ClientSender>, store: Arc<ConnectionStore>) -> Self {
        Self { client, store }
    }

    pub async fn send<P: Packet + Sync>(&self, room_id: &str, packet: &P) {
        let Some(room) = self.store.get_room(room_id) else {
            trace!(room_id, "send to unknown room dropped");
            return;
        };
        let envelope = match Envelope::pack(packet) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(room_id, packet_type = P::TYPE, error = %e, "failed to pack outgoing packet");
                return;
            }
        };
        for member in room.member_ids() {
            self.client.send_envelope(&member, envelope.clone()).await;
        }
    }
}
