use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::watch;

/// Connection-lifecycle events the backplane publishes to everything that
/// needs to react to a Redis outage without polling — the connection
/// store's shadow cache and the ingress drain loop both subscribe to this.
///
/// Modeled as an explicit enum on a `watch` channel rather than exceptions
/// thrown mid-operation (Design Notes "Exception-driven control flow in
/// Redis operations"): each failed operation reports a
/// [`crate::error::BackplaneError`] to its caller, and only the
/// *connection-level* transition is broadcast here.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackplaneEvent {
    ConnectionRestored,
    ConnectionFailed,
}

/// "Retry whenever the last attempt was ≥ the floor interval ago" —
/// effectively infinite retry with a floor, per §4.4 Resilience.
pub struct ReconnectPolicy {
    floor: Duration,
    last_attempt: Mutex<Option<Instant>>,
}

impl ReconnectPolicy {
    pub fn new(floor: Duration) -> Self {
        Self {
            floor,
            last_attempt: Mutex::new(None),
        }
    }

    /// Whether a reconnect attempt is due right now. Also records the
    /// attempt if it returns `true`, so back-to-back calls within the
    /// floor interval return `false` without the caller tracking time
    /// itself.
    pub fn should_retry(&self) -> bool {
        let mut last = self.last_attempt.lock().unwrap();
        let due = match *last {
            None => true,
            Some(t) => t.elapsed() >= self.floor,
        };
        if due {
            *last = Some(Instant::now());
        }
        due
    }
}

/// The shared event bus plus the idempotent "have we already subscribed"
/// bookkeeping the ingress loop needs across reconnects.
pub struct BackplaneEvents {
    tx: watch::Sender<BackplaneEvent>,
}

impl BackplaneEvents {
    pub fn new() -> (Self, watch::Receiver<BackplaneEvent>) {
        let (tx, rx) = watch::channel(BackplaneEvent::ConnectionFailed);
        (Self { tx }, rx)
    }

    pub fn publish(&self, event: BackplaneEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_always_retries() {
        let policy = ReconnectPolicy::new(Duration::from_millis(5000));
        assert!(policy.should_retry());
    }

    #[test]
    fn immediate_second_call_does_not_retry() {
        let policy = ReconnectPolicy::new(Duration::from_millis(5000));
        assert!(policy.should_retry());
        assert!(!policy.should_retry());
    }
}
