use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use altruist_core::{ClientId, PacketHeader, ProcessId};
use altruist_core::packet::InterprocessPacket;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RedisConfig;
use crate::directory::ConnectionDirectory;
use crate::documents::DocumentStore;
use crate::error::BackplaneError;
use crate::pool::RedisPool;
use crate::queue::{IngressQueue, NOTIFY_CHANNEL};
use crate::reconnect::{BackplaneEvent, BackplaneEvents, ReconnectPolicy};

/// Where a drained [`InterprocessPacket`] is delivered once it clears the
/// skip-self check. Implemented by the root crate's `ClientSender` so this
/// crate never depends on the router (Design Notes "Global service
/// locator" — explicit constructor injection instead).
#[async_trait]
pub trait IngressSink: Send + Sync {
    async fn deliver(&self, receiver: ClientId, inner_type: String, payload: Value);
}

/// The Redis-based cross-process backplane: egress queueing, the
/// supervised ingress drain loop, the keyed document store, and the
/// [`ConnectionDirectory`] shadow resolver, all sharing one connection
/// pool.
pub struct RedisBackplane {
    config: RedisConfig,
    client: redis::Client,
    queue: IngressQueue,
    documents: DocumentStore,
    directory: Arc<ConnectionDirectory>,
    process_id: ProcessId,
    events: BackplaneEvents,
    events_rx: watch::Receiver<BackplaneEvent>,
    reconnect: ReconnectPolicy,
    subscribed: AtomicBool,
    stop: Arc<AtomicBool>,
}

impl RedisBackplane {
    pub async fn connect(config: RedisConfig, process_id: ProcessId) -> Result<Arc<Self>, BackplaneError> {
        let pool = RedisPool::connect(&config).await?;
        let client = redis::Client::open(config.redis_url())?;
        let documents = DocumentStore::new(pool.clone());
        let directory = Arc::new(ConnectionDirectory::new(documents.clone()));
        let (events, events_rx) = BackplaneEvents::new();

        Ok(Arc::new(Self {
            reconnect: ReconnectPolicy::new(config.reconnect_floor),
            queue: IngressQueue::new(pool),
            client,
            documents,
            directory,
            process_id,
            events,
            events_rx,
            subscribed: AtomicBool::new(false),
            stop: Arc::new(AtomicBool::new(false)),
            config,
        }))
    }

    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn directory(&self) -> Arc<ConnectionDirectory> {
        self.directory.clone()
    }

    /// A receiver that observes every [`BackplaneEvent`] published by the
    /// ingress subscriber loop — used by `ConnectionStore` to know when the
    /// shadow resolver's view of the cluster might be stale.
    pub fn subscribe_events(&self) -> watch::Receiver<BackplaneEvent> {
        self.events_rx.clone()
    }

    /// Wraps `header`/`inner_packet` as an [`InterprocessPacket`] tagged
    /// with this process's id and left-pushes it onto the shared queue,
    /// publishing the wake signal. Used by `ClientSender` when a receiver
    /// isn't locally owned.
    pub async fn enqueue_for_peer(&self, header: PacketHeader, inner_type: impl Into<String>, inner_packet: Value) -> Result<(), BackplaneError> {
        let packet = InterprocessPacket::new(self.process_id, header, inner_type, inner_packet);
        self.queue.enqueue(&packet).await
    }

    /// Spawns the supervised pub/sub subscriber + drain loop. Restarted
    /// automatically (bounded by [`ReconnectPolicy`]) whenever the
    /// subscription drops.
    pub fn spawn_ingress_loop(self: &Arc<Self>, sink: Arc<dyn IngressSink>) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.run_supervised(sink).await })
    }

    /// Spawns a background task that periodically rebuilds the
    /// [`ConnectionDirectory`] mirror from the cluster's published
    /// documents.
    pub fn spawn_directory_refresh(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if this.stop.load(Ordering::Acquire) {
                    return;
                }
                if let Err(e) = this.directory.refresh().await {
                    ConnectionDirectory::log_refresh_failure(&e);
                }
            }
        })
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    async fn run_supervised(self: Arc<Self>, sink: Arc<dyn IngressSink>) {
        while !self.stop.load(Ordering::Acquire) {
            match self.run_subscriber(&sink).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(error = %e, "redis subscriber loop failed; will reconnect");
                    self.subscribed.store(false, Ordering::Release);
                    self.events.publish(BackplaneEvent::ConnectionFailed);
                }
            }

            while !self.reconnect.should_retry() {
                if self.stop.load(Ordering::Acquire) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
    }

    async fn run_subscriber(&self, sink: &Arc<dyn IngressSink>) -> Result<(), BackplaneError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(NOTIFY_CHANNEL).await?;

        if !self.subscribed.swap(true, Ordering::AcqRel) {
            info!(channel = NOTIFY_CHANNEL, "subscribed to ingress notifications");
        }
        self.events.publish(BackplaneEvent::ConnectionRestored);

        // A backlog may already be sitting in the queue from before this
        // subscription existed (e.g. right after a reconnect); drain once
        // up front instead of waiting for the next publish.
        self.drain(sink).await?;

        let mut messages = pubsub.on_message();
        while let Some(_msg) = messages.next().await {
            if self.stop.load(Ordering::Acquire) {
                return Ok(());
            }
            self.drain(sink).await?;
        }

        Err(BackplaneError::Connection(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "pub/sub message stream ended",
        ))))
    }

    /// Drains the shared queue until empty, applying the skip-self rule.
    async fn drain(&self, sink: &Arc<dyn IngressSink>) -> Result<(), BackplaneError> {
        loop {
            let Some(packet) = self.queue.drain_once().await? else {
                return Ok(());
            };

            if packet.originated_from(self.process_id) {
                debug!(process_id = %self.process_id, "skipping self-originated interprocess packet");
                continue;
            }

            let Some(receiver) = packet.header.receiver.clone() else {
                warn!(inner_type = %packet.inner_type, "interprocess packet has no receiver; dropping");
                continue;
            };

            sink.deliver(ClientId::new(receiver), packet.inner_type, packet.inner_packet).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_for_peer_tags_with_own_process_id() {
        // Exercises the loop-prevention invariant at the construction
        // boundary without needing a live Redis: `InterprocessPacket::new`
        // is what `enqueue_for_peer` calls internally.
        let pid = ProcessId::generate();
        let header = PacketHeader::new("server");
        let packet = InterprocessPacket::new(pid, header, "SuccessPacket", serde_json::json!({}));
        assert!(packet.originated_from(pid));
    }
}
