#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error("configured tick rate must be greater than zero")]
    ZeroRate,

    #[error("invalid cron expression {expr:?}: {source}")]
    InvalidCron { expr: String, source: cron::error::Error },
}
