//! `AppConfig`: every value enumerated in the design's configuration
//! section, loaded from an optional TOML file and overridable by
//! `ALTRUIST_`-prefixed environment variables (the `config` crate's
//! standard layered-source pattern).

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use altruist_tick::TickEngineConfig;

/// `engine.unit`: whether `engine.throttle` is read as a raw per-tick task
/// budget (`Ticks`) or derived from `engine.hz` (`Hz`).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub enum EngineUnit {
    Ticks,
    #[default]
    Hz,
}

/// The `engine.*` configuration values.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub hz: u32,
    pub unit: EngineUnit,
    /// `None` derives the default `⌊1e9 / (hz + 1)⌋` bound; `Some` pins it
    /// explicitly (meaningful only when `unit == Ticks`).
    pub throttle: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hz: 30,
            unit: EngineUnit::Hz,
            throttle: None,
        }
    }
}

impl EngineConfig {
    pub fn to_tick_engine_config(&self) -> TickEngineConfig {
        let mut config = TickEngineConfig::new(self.hz);
        if let Some(throttle) = self.throttle {
            config.throttle = throttle;
        }
        config
    }
}

/// The `cache.*` configuration values (the Redis backplane).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub contact_points: Vec<String>,
    pub connect_timeout_ms: u64,
    pub sync_timeout_ms: u64,
    pub async_timeout_ms: u64,
    pub reconnect_floor_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            contact_points: vec!["localhost:6379".to_owned()],
            connect_timeout_ms: 1000,
            sync_timeout_ms: 1000,
            async_timeout_ms: 1000,
            reconnect_floor_ms: 5000,
        }
    }
}

#[cfg(feature = "redis")]
impl CacheConfig {
    pub fn to_redis_config(&self) -> altruist_redis::RedisConfig {
        altruist_redis::RedisConfig {
            contact_points: self.contact_points.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            sync_timeout: Duration::from_millis(self.sync_timeout_ms),
            async_timeout: Duration::from_millis(self.async_timeout_ms),
            reconnect_floor: Duration::from_millis(self.reconnect_floor_ms),
        }
    }
}

/// The `transport.*` configuration values.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    pub address: SocketAddr,
    pub max_connections: usize,
    pub keep_alive_minutes: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: ([0, 0, 0, 0], 7777).into(),
            max_connections: 1024,
            keep_alive_minutes: 2,
        }
    }
}

impl TransportConfig {
    pub fn to_network_config(&self) -> altruist_network::NetworkConfig {
        altruist_network::NetworkConfig {
            address: self.address,
            max_connections: self.max_connections,
            keep_alive_minutes: self.keep_alive_minutes,
        }
    }
}

/// Top-level configuration, loaded by [`AppConfig::load`].
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub cache: CacheConfig,
    pub transport: TransportConfig,
    /// An `EnvFilter` directive string, e.g. `"info"` or
    /// `"altruist_tick=debug,info"`.
    pub log_filter: String,
    /// Whether the Redis backplane is wired in. Meaningless when the
    /// `redis` feature is compiled out.
    pub redis_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            cache: CacheConfig::default(),
            transport: TransportConfig::default(),
            log_filter: "info".to_owned(),
            redis_enabled: cfg!(feature = "redis"),
        }
    }
}

impl AppConfig {
    /// Loads configuration layered as: built-in defaults, an optional
    /// `altruist.toml` in the current directory, then `ALTRUIST_`-prefixed
    /// environment variables — the `config` crate's standard precedence
    /// order, last source wins.
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&AppConfig::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("altruist").required(false))
            .add_source(config::Environment::with_prefix("ALTRUIST").separator("__").try_parsing(true))
            .build()?;
        settings.try_deserialize()
    }
}
