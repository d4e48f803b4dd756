use std::sync::Arc;

use altruist_core::{ClientId, PacketHeader};
use altruist_protocol::{Envelope, Format, PacketEncoder};
use altruist_store::ConnectionStore;
use altruist_tick::{TaskFuture, TickEngine};
use async_trait::async_trait;
use tracing::{trace, warn};

use crate::egress::Egress;

/// `send(clientId, packet)`, the one primitive every other sender builds on.
///
/// The public, ergonomic entry point is [`ClientSenderExt::send`]; this
/// trait's own method takes a pre-packed [`Envelope`] so it stays
/// object-safe (no generic method can appear on a `dyn` trait) and
/// `Arc<dyn ClientSender>` is what `Router` actually hands out.
#[async_trait]
pub trait ClientSender: Send + Sync {
    async fn send_envelope(&self, client: &ClientId, envelope: Envelope);
}

/// Adds the generic, packet-typed convenience method to any
/// [`ClientSender`], including `dyn ClientSender`.
#[async_trait]
pub trait ClientSenderExt {
    async fn send<P: altruist_core::Packet + Sync>(&self, client: &ClientId, packet: &P);
}

#[async_trait]
impl<T: ClientSender + ?Sized> ClientSenderExt for T {
    async fn send<P: altruist_core::Packet + Sync>(&self, client: &ClientId, packet: &P) {
        let envelope = match Envelope::pack(packet) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(client = %client, packet_type = P::TYPE, error = %e, "failed to pack outgoing packet");
                return;
            }
        };
        self.send_envelope(client, envelope).await;
    }
}

/// Delivers inline: local socket write, Redis enqueue, or silent drop,
/// exactly per §4.2's three-way branch. Used directly by [`DirectRouter`]
/// and wrapped by [`EngineRouter`] for tick-boundary coalescing.
pub struct DirectClientSender {
    store: Arc<ConnectionStore>,
    egress: Arc<dyn Egress>,
    format: Format,
}

impl DirectClientSender {
    pub fn new(store: Arc<ConnectionStore>, egress: Arc<dyn Egress>) -> Self {
        Self {
            store,
            egress,
            format: Format::Binary,
        }
    }
}

#[async_trait]
impl ClientSender for DirectClientSender {
    async fn send_envelope(&self, client: &ClientId, envelope: Envelope) {
        let Some(conn) = self.store.get_connection(client) else {
            trace!(client = %client, "send to unknown connection dropped");
            return;
        };

        if conn.is_local() && conn.is_connected() {
            let mut encoder = PacketEncoder::new();
            if let Err(e) = encoder.append_envelope(&envelope, self.format) {
                warn!(client = %client, error = %e, "failed to encode outgoing envelope");
                return;
            }
            if let Err(e) = conn.try_send(encoder.take().freeze()) {
                warn!(client = %client, error = %e, "failed to write to local socket");
            }
            return;
        }

        let header = PacketHeader::from_server().with_receiver(client.as_str());
        self.egress.enqueue(header, envelope.packet_type, envelope.payload).await;
    }
}

/// Wraps a [`ClientSender`] so every send goes through the tick engine's
/// dynamic-task queue, keyed `"<clientId>:<packetType>"` — at most one
/// send per key survives to the next tick (§8's coalescing invariant).
pub struct EngineClientSender {
    inner: Arc<dyn ClientSender>,
    engine: TickEngine,
}

impl EngineClientSender {
    pub fn new(inner: Arc<dyn ClientSender>, engine: TickEngine) -> Self {
        Self { inner, engine }
    }
}

#[async_trait]
impl ClientSender for EngineClientSender {
    async fn send_envelope(&self, client: &ClientId, envelope: Envelope) {
        let key = format!("{client}:{}", envelope.packet_type);
        let inner = self.inner.clone();
        let client = client.clone();
        self.engine.send_task(
            key,
            Arc::new(move || -> TaskFuture {
                let inner = inner.clone();
                let client = client.clone();
                let envelope = envelope.clone();
                Box::pin(async move {
                    inner.send_envelope(&client, envelope).await;
                })
            }),
        );
    }
}
