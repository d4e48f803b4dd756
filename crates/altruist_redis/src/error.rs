/// Errors raised by the Redis backplane.
///
/// Every variant here is a [`altruist_core::AltruistError::TransientIo`] at
/// the call sites that cross into the rest of the workspace — this enum
/// only exists so the reconnect policy (§4.4 "Resilience") has something
/// data-driven to pattern-match on instead of inspecting `anyhow::Error`.
#[derive(Debug, thiserror::Error)]
pub enum BackplaneError {
    #[error("redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("redis pool error: {0}")]
    Pool(#[from] bb8::RunError<redis::RedisError>),

    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to deserialize document of type {type_name:?}: {source}")]
    Deserialize {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no document type registered for discriminator {0:?}")]
    UnknownType(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl BackplaneError {
    /// Whether the reconnect policy should retry this error. Everything
    /// except a programming error (unknown type, bad serialization) is
    /// transient per the design's error taxonomy.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Pool(_) | Self::Timeout(_))
    }
}
