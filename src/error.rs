//! Re-exports the shared error taxonomy plus the framework-assembly-level
//! errors that only the root crate can produce (configuration loading,
//! startup wiring).

pub use altruist_core::AltruistError;

/// Errors raised while assembling or starting the framework, before a
/// single connection has been accepted.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to start tick engine: {0}")]
    Tick(#[from] altruist_tick::TickError),

    #[error("failed to register portal: {0}")]
    Portal(#[from] altruist_scheduler::SchedulerError),

    #[cfg(feature = "redis")]
    #[error("failed to connect to redis: {0}")]
    Redis(#[from] altruist_redis::BackplaneError),
}
