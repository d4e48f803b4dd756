use altruist_core::ClientId;
use altruist_core::packet::SyncPacket;
use altruist_sync::{Synced, SyncEngine};

use crate::router::broadcast::BroadcastSender;

/// `send(entity, forceAll=false)`: computes the delta via
/// [`SyncEngine::compute_delta`] and, if anything changed, broadcasts a
/// [`SyncPacket`] excluding the entity's owner.
///
/// Sync state is keyed by the entity's owning connection id, not by each
/// observer: §4.2 computes one delta and broadcasts it to everyone, while
/// §4.6 describes the state as `(clientId, entityType)` keyed — read
/// together, `clientId` here means "the entity's own key", so every
/// observer sees the same wire payload and the owner is excluded to avoid
/// echo. See DESIGN.md for this reading of the two sections.
pub struct ClientSynchronizator {
    broadcast: BroadcastSender,
    sync_engine: SyncEngine,
}

impl ClientSynchronizator {
    pub fn new(broadcast: BroadcastSender, sync_engine: SyncEngine) -> Self {
        Self { broadcast, sync_engine }
    }

    pub async fn send<T: Synced>(&self, entity: &T, owner: &ClientId, force_all: bool) {
        let delta = self.sync_engine.compute_delta(entity, owner, force_all);
        if delta.is_empty() {
            return;
        }

        let packet = SyncPacket {
            entity_type: T::ENTITY_TYPE.to_owned(),
            data: delta.changed,
        };
        self.broadcast.send(&packet, Some(owner)).await;
    }

    pub fn forget_client(&self, client: &ClientId) {
        self.sync_engine.forget_client(client);
    }
}
