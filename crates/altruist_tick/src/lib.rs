//! The tick engine: a fixed-rate loop running static periodic tasks,
//! coalesced dynamic tasks, and wallclock-scheduled cron jobs.
//!
//! The loop itself runs on a dedicated OS thread, never the tokio
//! scheduler, so it can't be starved by async work elsewhere in the
//! process; it holds a `tokio::runtime::Handle` to spawn the futures each
//! task produces.

mod engine;
mod error;
mod task;

pub use engine::{TickEngine, TickEngineConfig};
pub use error::TickError;
pub use task::{Instrumented, TaskFn, TaskFuture};

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use altruist_scheduler::{AppStatus, AppStatusGate};

    use super::*;

    fn counting_task(counter: Arc<AtomicU32>) -> TaskFn {
        Arc::new(move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn static_task_fires_once_ready() {
        let readiness = AppStatusGate::new();
        readiness.set(AppStatus::Alive);

        let engine = TickEngine::new(TickEngineConfig::new(200), tokio::runtime::Handle::current(), readiness).unwrap();
        let counter = Arc::new(AtomicU32::new(0));
        engine.schedule("test-static", 1, counting_task(counter.clone()));
        engine.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.stop();

        assert!(counter.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dynamic_tasks_coalesce_under_the_same_key() {
        let readiness = AppStatusGate::new();
        readiness.set(AppStatus::Alive);

        let engine = TickEngine::new(TickEngineConfig::new(1000), tokio::runtime::Handle::current(), readiness).unwrap();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        engine.send_task("client:SyncPacket", counting_task(first.clone()));
        engine.send_task("client:SyncPacket", counting_task(second.clone()));
        engine.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.stop();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tasks_scheduled_before_alive_are_preserved() {
        let readiness = AppStatusGate::new();
        let engine = TickEngine::new(TickEngineConfig::new(200), tokio::runtime::Handle::current(), readiness.clone()).unwrap();
        let counter = Arc::new(AtomicU32::new(0));
        engine.schedule("pre-alive", 1, counting_task(counter.clone()));
        engine.start();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0, "task must wait for Alive");

        readiness.set(AppStatus::Alive);
        tokio::time::sleep(Duration::from_millis(60)).await;
        engine.stop();

        assert!(counter.load(Ordering::SeqCst) > 0);
    }
}
