use std::time::Duration;

use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;

use crate::config::RedisConfig;
use crate::error::BackplaneError;

/// A pooled, timeout-wrapped handle onto Redis.
///
/// `bb8` over a single shared `MultiplexedConnection` so the reconnect
/// policy can evict and replace one bad pool member instead of tearing
/// down every in-flight caller — the corpus's own cache wrapper (see
/// DESIGN.md) pools connections the same way rather than holding one
/// connection behind a mutex.
#[derive(Clone)]
pub struct RedisPool {
    pool: bb8::Pool<RedisConnectionManager>,
    async_timeout: Duration,
}

impl RedisPool {
    pub async fn connect(config: &RedisConfig) -> Result<Self, BackplaneError> {
        let manager = RedisConnectionManager::new(config.redis_url())?;
        let pool = bb8::Pool::builder()
            .connection_timeout(config.connect_timeout)
            .build(manager)
            .await?;
        Ok(Self {
            pool,
            async_timeout: config.async_timeout,
        })
    }

    /// Runs `f` against a pooled connection, bounding the whole call by the
    /// configured async timeout. A timeout or a pool-checkout failure is
    /// always [`BackplaneError::is_transient`] — the reconnect policy is
    /// the only thing that should see it.
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T, BackplaneError>
    where
        F: FnOnce(bb8::PooledConnection<'_, RedisConnectionManager>) -> Fut,
        Fut: std::future::Future<Output = redis::RedisResult<T>>,
    {
        let conn = self.pool.get().await.map_err(BackplaneError::Pool)?;
        tokio::time::timeout(self.async_timeout, f(conn))
            .await
            .map_err(|_| BackplaneError::Timeout(self.async_timeout))?
            .map_err(BackplaneError::Connection)
    }

    pub async fn lpush(&self, key: &str, value: &str) -> Result<(), BackplaneError> {
        let key = key.to_owned();
        let value = value.to_owned();
        self.run(|mut c| async move { c.lpush(key, value).await }).await
    }

    pub async fn rpop(&self, key: &str) -> Result<Option<String>, BackplaneError> {
        let key = key.to_owned();
        self.run(|mut c| async move { c.rpop(key, None).await }).await
    }

    pub async fn publish(&self, channel: &str, message: &str) -> Result<(), BackplaneError> {
        let channel = channel.to_owned();
        let message = message.to_owned();
        self.run(|mut c| async move { c.publish(channel, message).await }).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), BackplaneError> {
        let key = key.to_owned();
        let value = value.to_owned();
        self.run(|mut c| async move { c.set(key, value).await }).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, BackplaneError> {
        let key = key.to_owned();
        self.run(|mut c| async move { c.get(key).await }).await
    }

    pub async fn del(&self, key: &str) -> Result<(), BackplaneError> {
        let key = key.to_owned();
        self.run(|mut c| async move { c.del(key).await }).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, BackplaneError> {
        let key = key.to_owned();
        self.run(|mut c| async move { c.exists(key).await }).await
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, BackplaneError> {
        let pattern = pattern.to_owned();
        self.run(|mut c| async move { c.keys(pattern).await }).await
    }

    pub async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, BackplaneError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let keys = keys.to_vec();
        self.run(|mut c| async move { c.mget(keys).await }).await
    }

    /// One page of a `SCAN` over `pattern`, matching the cursor semantics
    /// `altruist_redis::cursor` relies on: returns the next cursor position
    /// (`0` means the scan is complete) alongside this page's keys.
    pub async fn scan_page(&self, pattern: &str, cursor: u64, count: usize) -> Result<(u64, Vec<String>), BackplaneError> {
        let pattern = pattern.to_owned();
        self.run(|mut c| async move {
            redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(count)
                .query_async(&mut *c)
                .await
        })
        .await
    }
}
