use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use altruist_scheduler::AppStatusGate;
use chrono::Utc;
use cron::Schedule;
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::{error, warn};

use crate::error::TickError;
use crate::task::{Instrumented, TaskFn};

/// Engine configuration, mirroring the `engine.*` configuration values.
#[derive(Clone, Debug)]
pub struct TickEngineConfig {
    /// Ticks per second. Must be > 0.
    pub hz: u32,
    /// Bound on concurrent in-flight dynamic tasks before the loop forces a
    /// join barrier. Defaults to `floor(1e9 / (hz + 1))`.
    pub throttle: usize,
}

impl TickEngineConfig {
    pub fn new(hz: u32) -> Self {
        let throttle = (1_000_000_000u64 / (hz as u64 + 1)) as usize;
        Self { hz, throttle }
    }
}

struct StaticTask {
    cycle_rate: u64,
    ticks_since_fire: AtomicU64,
    task: TaskFn,
}

struct CronEntry {
    schedule: Schedule,
    next_fire: Mutex<chrono::DateTime<Utc>>,
    task: TaskFn,
}

/// Fixed-rate loop with static periodic tasks, coalesced dynamic tasks, and
/// cron jobs.
///
/// Runs on a dedicated OS thread rather than the tokio scheduler (see the
/// workspace's concurrency notes): the loop itself is synchronous, but it
/// holds a [`Handle`] to spawn the async work each task produces, the same
/// "runtime handle held alongside a dedicated thread" shape `altruist_network`
/// uses for its accept loop.
///
/// Cheap to clone: all state lives behind `Arc`, so a clone is another
/// handle onto the same engine, not a second engine.
#[derive(Clone)]
pub struct TickEngine {
    inner: Arc<Inner>,
}

struct Inner {
    config: TickEngineConfig,
    tokio_handle: Handle,
    readiness: AppStatusGate,
    static_tasks: RwLock<Vec<StaticTask>>,
    dynamic_tasks: DashMap<String, TaskFn>,
    cron_jobs: RwLock<Vec<CronEntry>>,
    stop_flag: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl TickEngine {
    pub fn new(config: TickEngineConfig, tokio_handle: Handle, readiness: AppStatusGate) -> Result<Self, TickError> {
        if config.hz == 0 {
            return Err(TickError::ZeroRate);
        }
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                tokio_handle,
                readiness,
                static_tasks: RwLock::new(Vec::new()),
                dynamic_tasks: DashMap::new(),
                cron_jobs: RwLock::new(Vec::new()),
                stop_flag: AtomicBool::new(false),
                thread: Mutex::new(None),
            }),
        })
    }

    pub fn rate(&self) -> u32 {
        self.inner.config.hz
    }

    /// Registers a static task firing every `cycle_rate` ticks.
    pub fn schedule(&self, label: &'static str, cycle_rate: u64, task: TaskFn) {
        let task = Instrumented::new(label, task).into_task_fn();
        self.inner.static_tasks.write().push(StaticTask {
            cycle_rate: cycle_rate.max(1),
            ticks_since_fire: AtomicU64::new(0),
            task,
        });
    }

    /// Submits a dynamic task under `id`. A later call with the same `id`
    /// before the next tick overwrites this one — the coalescing
    /// invariant: at most one submission per key survives per tick.
    pub fn send_task(&self, id: impl Into<String>, task: TaskFn) {
        self.inner.dynamic_tasks.insert(id.into(), task);
    }

    /// Registers a wallclock-scheduled job, independent of the tick loop's
    /// own rate.
    pub fn register_cron(&self, expr: &str, task: TaskFn) -> Result<(), TickError> {
        let schedule = Schedule::from_str(expr).map_err(|source| TickError::InvalidCron {
            expr: expr.to_owned(),
            source,
        })?;
        let next_fire = schedule.upcoming(Utc).next().unwrap_or_else(Utc::now);
        self.inner.cron_jobs.write().push(CronEntry {
            schedule,
            next_fire: Mutex::new(next_fire),
            task,
        });
        Ok(())
    }

    /// Spawns the dedicated loop thread. Tasks scheduled before the
    /// process reaches `AppStatus::Alive` are preserved; the loop just
    /// parks until then.
    pub fn start(&self) {
        let inner = self.inner.clone();
        let handle = std::thread::Builder::new()
            .name("altruist-tick".to_owned())
            .spawn(move || run_loop(inner))
            .expect("failed to spawn tick engine thread");
        *self.inner.thread.lock().unwrap() = Some(handle);
    }

    /// Cooperative stop: the next loop iteration observes the signal and
    /// exits. The thread is joined best-effort.
    pub fn stop(&self) {
        self.inner.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.inner.thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

fn run_loop(inner: Arc<Inner>) {
    inner.readiness.wait_until_alive_blocking();

    let tick_duration = Duration::from_secs_f64(1.0 / inner.config.hz as f64);
    let mut last_loop_tick = Instant::now();

    while !inner.stop_flag.load(Ordering::Acquire) {
        let elapsed = last_loop_tick.elapsed();
        if elapsed < tick_duration {
            std::thread::sleep((tick_duration - elapsed).min(Duration::from_millis(1)));
            continue;
        }

        fire_static_tasks(&inner);
        fire_dynamic_tasks(&inner);
        fire_cron_jobs(&inner);

        last_loop_tick = Instant::now();
    }
}

fn fire_static_tasks(inner: &Inner) {
    for task in inner.static_tasks.read().iter() {
        let ticks = task.ticks_since_fire.fetch_add(1, Ordering::Relaxed) + 1;
        if ticks >= task.cycle_rate {
            task.ticks_since_fire.store(0, Ordering::Relaxed);
            let fut = (task.task)();
            inner.tokio_handle.spawn(async move {
                fut.await;
            });
        }
    }
}

fn fire_dynamic_tasks(inner: &Inner) {
    let snapshot: Vec<TaskFn> = inner.dynamic_tasks.iter().map(|e| e.value().clone()).collect();
    inner.dynamic_tasks.clear();

    if snapshot.is_empty() {
        return;
    }

    let futures: Vec<_> = snapshot
        .iter()
        .cloned()
        .map(|task| inner.tokio_handle.spawn(async move { task().await }))
        .collect();

    if snapshot.len() > inner.config.throttle {
        inner.tokio_handle.block_on(join_all(futures));
    }
}

fn fire_cron_jobs(inner: &Inner) {
    let now = Utc::now();
    for job in inner.cron_jobs.read().iter() {
        let mut next_fire = job.next_fire.lock().unwrap();
        if now >= *next_fire {
            let fut = (job.task)();
            inner.tokio_handle.spawn(async move {
                fut.await;
            });

            match job.schedule.after(&now).next() {
                Some(next) => *next_fire = next,
                None => {
                    warn!("cron schedule produced no further occurrences");
                    *next_fire = now + chrono::Duration::days(3650);
                }
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.thread.lock().unwrap().is_some() && !self.stop_flag.load(Ordering::Acquire) {
            error!("TickEngine dropped without calling stop() first");
        }
    }
}
