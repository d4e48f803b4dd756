//! The seam `DirectClientSender` uses to hand a packet to a receiver it
//! doesn't own locally. Kept separate from `altruist_redis::RedisBackplane`
//! so the router never depends on Redis directly (Design Notes "Global
//! service locator" — constructor injection instead) and a deployment
//! without the `redis` feature still compiles and runs, just without
//! cross-process delivery.

use altruist_core::PacketHeader;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

#[async_trait]
pub trait Egress: Send + Sync {
    async fn enqueue(&self, header: PacketHeader, inner_type: String, payload: Value);
}

/// The default when the `redis` feature is disabled, or a deployment
/// chooses not to wire a backplane: cross-process delivery is simply
/// unavailable, and a send to a non-local receiver is dropped with a
/// warning rather than silently vanishing.
pub struct NoEgress;

#[async_trait]
impl Egress for NoEgress {
    async fn enqueue(&self, header: PacketHeader, inner_type: String, _payload: Value) {
        warn!(receiver = ?header.receiver, inner_type, "no backplane configured; dropping cross-process send");
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl Egress for altruist_redis::RedisBackplane {
    async fn enqueue(&self, header: PacketHeader, inner_type: String, payload: Value) {
        if let Err(e) = self.enqueue_for_peer(header, inner_type, payload).await {
            warn!(error = %e, "failed to enqueue packet onto the Redis backplane");
        }
    }
}
