use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Process-level readiness state. The tick engine parks until this reaches
/// [`AppStatus::Alive`]; tasks scheduled before then are preserved, not
/// dropped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum AppStatus {
    Starting = 0,
    Alive = 1,
    ShuttingDown = 2,
}

impl AppStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Alive,
            2 => Self::ShuttingDown,
            _ => Self::Starting,
        }
    }
}

/// How often a parked waiter re-checks [`AppStatus`].
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Shared, cheaply cloned handle onto the process's [`AppStatus`].
///
/// The framework assembly holds the single instance and flips it to
/// `Alive` once startup completes; every other component only ever reads
/// it through this handle.
#[derive(Clone)]
pub struct AppStatusGate(Arc<AtomicU8>);

impl Default for AppStatusGate {
    fn default() -> Self {
        Self(Arc::new(AtomicU8::new(AppStatus::Starting as u8)))
    }
}

impl AppStatusGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> AppStatus {
        AppStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, status: AppStatus) {
        self.0.store(status as u8, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.get() == AppStatus::Alive
    }

    /// Blocks the current (non-async) thread until the process is
    /// [`AppStatus::Alive`]. Used by the tick engine's dedicated OS thread,
    /// which deliberately never touches the tokio runtime.
    pub fn wait_until_alive_blocking(&self) {
        while !self.is_alive() {
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// The async equivalent, for components that live on the tokio runtime.
    pub async fn wait_until_alive_async(&self) {
        while !self.is_alive() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_alive() {
        let gate = AppStatusGate::new();
        assert!(!gate.is_alive());
        gate.set(AppStatus::Alive);
        assert!(gate.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_alive_async_returns_once_set() {
        let gate = AppStatusGate::new();
        let waiter = gate.clone();
        let handle = tokio::spawn(async move { waiter.wait_until_alive_async().await });

        tokio::time::advance(POLL_INTERVAL * 2).await;
        gate.set(AppStatus::Alive);
        tokio::time::advance(POLL_INTERVAL).await;

        handle.await.unwrap();
    }
}
