//! Per-tick dynamic-task coalescing: two sends to the same
//! `(clientId, packetType)` pair before the next tick fires must collapse
//! into one delivery, carrying the later value.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use altruist::{ClientSender, ClientSenderExt, EngineClientSender, Envelope, SuccessPacket};
use altruist_scheduler::{AppStatus, AppStatusGate};
use altruist_tick::{TickEngine, TickEngineConfig};
use async_trait::async_trait;

struct RecordingSender {
    deliveries: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

#[async_trait]
impl ClientSender for RecordingSender {
    async fn send_envelope(&self, _client: &altruist::ClientId, envelope: Envelope) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let message: SuccessPacket = envelope.unpack().unwrap();
        self.deliveries.lock().unwrap().push(message.message);
    }
}

#[tokio::test]
async fn two_sends_within_one_tick_collapse_to_the_last() {
    let readiness = AppStatusGate::new();
    readiness.set(AppStatus::Alive);
    let engine = TickEngine::new(TickEngineConfig::new(50), tokio::runtime::Handle::current(), readiness).unwrap();

    let recorder = Arc::new(RecordingSender {
        deliveries: Mutex::new(Vec::new()),
        calls: AtomicUsize::new(0),
    });
    let inner: Arc<dyn ClientSender> = recorder.clone();
    let coalesced = EngineClientSender::new(inner, engine.clone());

    engine.start();

    coalesced
        .send(
            &"client-1".into(),
            &SuccessPacket {
                message: "first".to_owned(),
            },
        )
        .await;
    coalesced
        .send(
            &"client-1".into(),
            &SuccessPacket {
                message: "second".to_owned(),
            },
        )
        .await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    engine.stop();

    let deliveries = recorder.deliveries.lock().unwrap();
    assert_eq!(deliveries.as_slice(), ["second"]);
}
