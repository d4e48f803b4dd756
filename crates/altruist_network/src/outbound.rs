use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use altruist_core::{OutboundHandle, SendError};
use tokio::sync::Notify;

/// The write side of a locally owned WebSocket connection.
///
/// `try_send` never blocks: it hands the frame to an unbounded channel
/// drained by the connection's writer task. An unbounded channel is
/// deliberate here — backpressure on a slow client is the writer task's
/// problem (it closes the socket), not the caller's.
pub struct WsOutboundHandle {
    tx: flume::Sender<bytes::Bytes>,
    connected: Arc<AtomicBool>,
    close_signal: Arc<Notify>,
}

impl WsOutboundHandle {
    pub fn new(tx: flume::Sender<bytes::Bytes>, connected: Arc<AtomicBool>, close_signal: Arc<Notify>) -> Self {
        Self { tx, connected, close_signal }
    }
}

impl OutboundHandle for WsOutboundHandle {
    fn try_send(&self, frame: bytes::Bytes) -> Result<(), SendError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(SendError::Closed);
        }
        self.tx.send(frame).map_err(|_| SendError::Closed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.connected.store(false, Ordering::Release);
        self.close_signal.notify_one();
    }
}
