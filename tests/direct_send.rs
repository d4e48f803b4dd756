//! Local direct send and the cross-process fallback: the two halves of
//! §4.2's three-way branch a `ClientSender` resolves (the third, "unknown
//! receiver", is covered inline in `router::client`'s own tests).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use altruist::{ClientSender, ClientSenderExt, Connection, ConnectionState, DirectClientSender, Egress, NoEgress, Packet, PacketHeader, ProcessId, SuccessPacket, TransportKind};
use altruist_core::{OutboundHandle, SendError};
use altruist_protocol::PacketDecoder;
use altruist_store::{ConnectionStore, ShadowInfo, ShadowResolver};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

struct CapturingHandle {
    connected: AtomicBool,
    frames: Mutex<Vec<Bytes>>,
}

impl CapturingHandle {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            frames: Mutex::new(Vec::new()),
        }
    }
}

impl OutboundHandle for CapturingHandle {
    fn try_send(&self, frame: Bytes) -> Result<(), SendError> {
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

struct RecordingEgress {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingEgress {
    fn new() -> Self {
        Self { calls: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl Egress for RecordingEgress {
    async fn enqueue(&self, header: PacketHeader, inner_type: String, _payload: Value) {
        self.calls.lock().unwrap().push((header.receiver.unwrap_or_default(), inner_type));
    }
}

#[tokio::test]
async fn local_connected_send_reaches_the_socket() {
    let store = Arc::new(ConnectionStore::standalone());
    let handle = Arc::new(CapturingHandle::new());
    let conn = Arc::new(Connection::new_local("alice".into(), TransportKind::WebSocket, ProcessId::generate(), handle.clone()));
    conn.set_state(ConnectionState::Joined);
    store.add_connection(conn, None);

    let egress: Arc<dyn Egress> = Arc::new(NoEgress);
    let sender = DirectClientSender::new(store, egress);

    sender
        .send(
            &"alice".into(),
            &SuccessPacket {
                message: "welcome".to_owned(),
            },
        )
        .await;

    let frames = handle.frames.lock().unwrap();
    assert_eq!(frames.len(), 1);

    // `DirectClientSender` defaults to the binary format; decode the
    // captured frame back to confirm `decode(encode(p)) == p` holds for it,
    // not just that a frame was produced.
    let mut decoder = PacketDecoder::new();
    decoder.queue_slice(&frames[0]);
    let envelope = decoder.try_next_frame().unwrap().expect("complete frame");
    let decoded: SuccessPacket = envelope.unpack().unwrap();
    assert_eq!(decoded.message, "welcome");
}

#[tokio::test]
async fn send_to_unknown_client_is_dropped_silently() {
    let store = Arc::new(ConnectionStore::standalone());
    let egress = Arc::new(RecordingEgress::new());
    let sender = DirectClientSender::new(store, egress.clone() as Arc<dyn Egress>);

    sender
        .send(
            &"ghost".into(),
            &SuccessPacket {
                message: "hi".to_owned(),
            },
        )
        .await;

    assert!(egress.calls.lock().unwrap().is_empty());
}

struct SingleShadow {
    owner: ProcessId,
}

impl ShadowResolver for SingleShadow {
    fn resolve(&self, id: &altruist::ClientId) -> Option<ShadowInfo> {
        (id.as_str() == "bob").then_some(ShadowInfo {
            transport: TransportKind::WebSocket,
            owner_process_id: self.owner,
        })
    }
}

#[tokio::test]
async fn send_to_a_connection_owned_by_another_process_goes_through_egress() {
    let owner = ProcessId::generate();
    let store = Arc::new(ConnectionStore::new(Arc::new(SingleShadow { owner })));
    let egress = Arc::new(RecordingEgress::new());
    let sender = DirectClientSender::new(store, egress.clone() as Arc<dyn Egress>);

    sender
        .send(
            &"bob".into(),
            &SuccessPacket {
                message: "hi".to_owned(),
            },
        )
        .await;

    let calls = egress.calls.lock().unwrap();
    assert_eq!(calls.as_slice(), [("bob".to_owned(), SuccessPacket::TYPE.to_owned())]);
}
