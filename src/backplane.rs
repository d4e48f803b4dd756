//! Bridges an inbound Redis backplane delivery to the local router.
//!
//! `altruist_redis::RedisBackplane::spawn_ingress_loop` drains the shared
//! queue and, for every packet not self-originated, calls
//! [`IngressSink::deliver`] with the receiver id plus the already-decoded
//! `(type, payload)` pair. Turning that into a send is exactly what
//! [`ClientSender::send_envelope`](crate::router::ClientSender::send_envelope)
//! already does, so this sink is a thin adapter rather than a second
//! delivery path.

use std::sync::Arc;

use altruist_core::ClientId;
use altruist_protocol::Envelope;
use altruist_redis::IngressSink;
use async_trait::async_trait;
use serde_json::Value;

use crate::router::Router;

pub struct RouterIngressSink {
    router: Arc<dyn Router>,
}

impl RouterIngressSink {
    pub fn new(router: Arc<dyn Router>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl IngressSink for RouterIngressSink {
    async fn deliver(&self, receiver: ClientId, inner_type: String, payload: Value) {
        let envelope = Envelope {
            packet_type: inner_type,
            payload,
        };
        self.router.client().send_envelope(&receiver, envelope).await;
    }
}
