use std::time::Duration;

/// The `cache.*` configuration values.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// `host:port` pairs. Only the first is dialed today; the list shape
    /// is kept so a future Redis Cluster client can fan out across all of
    /// them without a config format change.
    pub contact_points: Vec<String>,
    pub connect_timeout: Duration,
    pub sync_timeout: Duration,
    pub async_timeout: Duration,
    /// Floor interval between reconnect attempts.
    pub reconnect_floor: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            contact_points: vec!["localhost:6379".to_owned()],
            connect_timeout: Duration::from_millis(1000),
            sync_timeout: Duration::from_millis(1000),
            async_timeout: Duration::from_millis(1000),
            reconnect_floor: Duration::from_millis(5000),
        }
    }
}

impl RedisConfig {
    pub fn redis_url(&self) -> String {
        let host = self.contact_points.first().map(String::as_str).unwrap_or("localhost:6379");
        format!("redis://{host}")
    }
}
