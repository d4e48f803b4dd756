use altruist_core::packet::InterprocessPacket;

use crate::error::BackplaneError;
use crate::pool::RedisPool;

/// Left-push/right-pop FIFO producer→consumer queue.
pub const QUEUE_KEY: &str = "altruist:ingress:queue";

/// Published (empty body) whenever a producer pushes onto [`QUEUE_KEY`], so
/// consumers don't have to poll.
pub const NOTIFY_CHANNEL: &str = "altruist:ingress:distribute";

/// The egress/ingress queue described in §4.4: one shared Redis list plus a
/// wake-up pub/sub channel.
#[derive(Clone)]
pub struct IngressQueue {
    pool: RedisPool,
}

impl IngressQueue {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Left-pushes `packet` and fire-and-forget publishes the wake signal.
    pub async fn enqueue(&self, packet: &InterprocessPacket) -> Result<(), BackplaneError> {
        let encoded = serde_json::to_string(packet).map_err(BackplaneError::Serialize)?;
        self.pool.lpush(QUEUE_KEY, &encoded).await?;
        self.pool.publish(NOTIFY_CHANNEL, "").await?;
        Ok(())
    }

    /// Right-pops one message, if any. `None` means the queue was empty at
    /// the moment of the call — the caller's drain loop should stop.
    pub async fn drain_once(&self) -> Result<Option<InterprocessPacket>, BackplaneError> {
        match self.pool.rpop(QUEUE_KEY).await? {
            Some(raw) => {
                let packet: InterprocessPacket = serde_json::from_str(&raw).map_err(|source| BackplaneError::Deserialize {
                    type_name: "InterprocessPacket".to_owned(),
                    source,
                })?;
                Ok(Some(packet))
            }
            None => Ok(None),
        }
    }
}
