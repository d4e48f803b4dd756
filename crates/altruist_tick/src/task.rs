use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

/// A boxed, type-erased async task.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A task registered with the engine: fire-and-forget, producing a future
/// each time it's invoked.
pub type TaskFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// How often an [`Instrumented`] task logs its execution count.
const LOG_EVERY: u64 = 1_000_000;

/// Wraps a task with an invocation counter that logs throughput every
/// [`LOG_EVERY`] executions. Functionally transparent: the wrapped task
/// always runs exactly as the original would.
pub struct Instrumented {
    label: &'static str,
    inner: TaskFn,
    count: Arc<AtomicU64>,
}

impl Instrumented {
    pub fn new(label: &'static str, inner: TaskFn) -> Self {
        Self {
            label,
            inner,
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Produces a [`TaskFn`] suitable for registration, wrapping the
    /// original task with the counter.
    pub fn into_task_fn(self) -> TaskFn {
        let Instrumented { label, inner, count } = self;
        Arc::new(move || {
            let n = count.fetch_add(1, Ordering::Relaxed) + 1;
            if n % LOG_EVERY == 0 {
                info!(label, executions = n, "task execution milestone");
            }
            inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    #[tokio::test]
    async fn instrumented_still_runs_the_inner_task() {
        let ran = Arc::new(AtomicU32::new(0));
        let ran2 = ran.clone();
        let task: TaskFn = Arc::new(move || {
            let ran = ran2.clone();
            Box::pin(async move {
                ran.fetch_add(1, Ordering::SeqCst);
            })
        });

        let wrapped = Instrumented::new("test", task).into_task_fn();
        wrapped().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
