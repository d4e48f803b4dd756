//! The router: aggregates the four senders described in §4.2 behind a
//! trait so portal code depends on `dyn Router`, not a concrete router
//! (Design Notes item 3, "Global service locator" → constructor injection).

mod broadcast;
mod client;
mod room;
mod synchronize;

use std::sync::Arc;

use altruist_store::ConnectionStore;
use altruist_sync::SyncEngine;
use altruist_tick::TickEngine;

pub use broadcast::BroadcastSender;
pub use client::{ClientSender, ClientSenderExt, DirectClientSender, EngineClientSender};
pub use room::RoomSender;
pub use synchronize::ClientSynchronizator;

use crate::egress::Egress;

/// Aggregates `client`, `room`, `broadcast`, and `sync`. `DirectRouter` and
/// `EngineRouter` both implement this; only the `Client` sender's delivery
/// strategy differs between the two, so `Room`/`Broadcast`/`Sync` are built
/// generically on top of whichever `ClientSender` is injected.
pub trait Router: Send + Sync {
    fn client(&self) -> &dyn ClientSender;
    fn room(&self) -> &RoomSender;
    fn broadcast(&self) -> &BroadcastSender;
    fn sync(&self) -> &ClientSynchronizator;
}

/// Senders run inline: a call resolves and delivers synchronously, up to
/// the socket write or Redis enqueue, with no tick-boundary coalescing.
pub struct DirectRouter {
    client: Arc<DirectClientSender>,
    room: RoomSender,
    broadcast: BroadcastSender,
    sync: ClientSynchronizator,
}

impl DirectRouter {
    pub fn new(store: Arc<ConnectionStore>, egress: Arc<dyn Egress>, sync_engine: SyncEngine) -> Self {
        let client = Arc::new(DirectClientSender::new(store.clone(), egress));
        let dyn_client: Arc<dyn ClientSender> = client.clone();
        let room = RoomSender::new(dyn_client.clone(), store.clone());
        let broadcast = BroadcastSender::new(dyn_client, store);
        let sync = ClientSynchronizator::new(broadcast.clone(), sync_engine);
        Self { client, room, broadcast, sync }
    }
}

impl Router for DirectRouter {
    fn client(&self) -> &dyn ClientSender {
        self.client.as_ref()
    }

    fn room(&self) -> &RoomSender {
        &self.room
    }

    fn broadcast(&self) -> &BroadcastSender {
        &self.broadcast
    }

    fn sync(&self) -> &ClientSynchronizator {
        &self.sync
    }
}

/// The `Client` sender routes through [`TickEngine::send_task`], coalescing
/// every send addressed to the same `(clientId, packetType)` pair within a
/// tick window down to the last one (§8's coalescing invariant).
/// `Room`/`Broadcast`/`Sync` build on the same coalescing client sender, so
/// every delivery path benefits from it uniformly.
pub struct EngineRouter {
    client: Arc<EngineClientSender>,
    room: RoomSender,
    broadcast: BroadcastSender,
    sync: ClientSynchronizator,
}

impl EngineRouter {
    pub fn new(store: Arc<ConnectionStore>, egress: Arc<dyn Egress>, sync_engine: SyncEngine, engine: TickEngine) -> Self {
        let base: Arc<dyn ClientSender> = Arc::new(DirectClientSender::new(store.clone(), egress));
        let client = Arc::new(EngineClientSender::new(base, engine));
        let dyn_client: Arc<dyn ClientSender> = client.clone();
        let room = RoomSender::new(dyn_client.clone(), store.clone());
        let broadcast = BroadcastSender::new(dyn_client, store);
        let sync = ClientSynchronizator::new(broadcast.clone(), sync_engine);
        Self { client, room, broadcast, sync }
    }
}

impl Router for EngineRouter {
    fn client(&self) -> &dyn ClientSender {
        self.client.as_ref()
    }

    fn room(&self) -> &RoomSender {
        &self.room
    }

    fn broadcast(&self) -> &BroadcastSender {
        &self.broadcast
    }

    fn sync(&self) -> &ClientSynchronizator {
        &self.sync
    }
}
