//! Redis-backed cache store.
//!
//! Requires the `redis` feature. One multiplexed connection is opened at
//! construction and cloned per call; closing the store just stops handing
//! out clones.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tracing::info;

use super::config::{env_duration_secs, env_string_or_default};
use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::traits::{CacheStats, CacheStore};

const DEFAULT_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_PREFIX: &str = "storefront:";

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379").
    pub url: String,
    /// Prefix prepended to every cache key.
    pub prefix: String,
    pub connect_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: env_string_or_default("STOREFRONT_REDIS_URL", DEFAULT_URL),
            prefix: env_string_or_default("STOREFRONT_REDIS_PREFIX", DEFAULT_PREFIX),
            connect_timeout: env_duration_secs(
                "STOREFRONT_REDIS_CONNECT_TIMEOUT_SECS",
                Duration::from_secs(5),
            ),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// [`CacheStore`] over a single Redis node.
///
/// TTLs are set with `PSETEX`; `delete_many` is one multi-key `DEL`.
/// Hit and miss counts are tracked client-side.
pub struct RedisCacheStore {
    conn: MultiplexedConnection,
    config: RedisConfig,
    closed: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RedisCacheStore {
    /// Connect to Redis. Fails with `BackendUnavailable` if the node cannot
    /// be reached within the connect timeout.
    pub async fn connect(config: RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::unavailable(format!("Redis client error: {}", e)))?;

        let conn = tokio::time::timeout(
            config.connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            CacheError::unavailable(format!(
                "Redis connect timed out after {}s",
                config.connect_timeout.as_secs()
            ))
        })?
        .map_err(|e| CacheError::unavailable(format!("Redis connection error: {}", e)))?;

        info!(url = %config.url, prefix = %config.prefix, "Connected to Redis cache");
        Ok(Self {
            conn,
            config,
            closed: AtomicBool::new(false),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> CacheResult<Self> {
        Self::connect(RedisConfig::from_env()).await
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    fn prefixed_key(&self, key: &CacheKey) -> String {
        format!("{}{}", self.config.prefix, key.as_str())
    }

    fn connection(&self) -> CacheResult<MultiplexedConnection> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::unavailable("Redis cache store is closed"));
        }
        Ok(self.conn.clone())
    }
}

fn redis_error(op: &str, err: redis::RedisError) -> CacheError {
    CacheError::unavailable(format!("Redis {} error: {}", op, err))
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection()?;
        let result: Option<Vec<u8>> = conn
            .get(self.prefixed_key(key))
            .await
            .map_err(|e| redis_error("GET", e))?;

        let counter = if result.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(result)
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection()?;
        // PSETEX rejects a zero expiry.
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = conn
            .pset_ex(self.prefixed_key(key), value, millis)
            .await
            .map_err(|e| redis_error("PSETEX", e))?;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        let mut conn = self.connection()?;
        let deleted: i64 = conn
            .del(self.prefixed_key(key))
            .await
            .map_err(|e| redis_error("DEL", e))?;
        Ok(deleted > 0)
    }

    async fn delete_many(&self, keys: &[CacheKey]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection()?;
        let prefixed: Vec<String> = keys.iter().map(|key| self.prefixed_key(key)).collect();
        let deleted: i64 = conn
            .del(prefixed)
            .await
            .map_err(|e| redis_error("DEL", e))?;
        Ok(deleted.max(0) as u64)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        self.connection()?;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            // Entry counts and memory live server-side.
            ..Default::default()
        })
    }

    async fn close(&self) -> CacheResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(url = %self.config.url, "Closed Redis cache store");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = RedisConfig::default()
            .with_url("redis://cache:6379")
            .with_prefix("shop:");
        assert_eq!(config.url, "redis://cache:6379");
        assert_eq!(config.prefix, "shop:");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result = RedisCacheStore::connect(RedisConfig::default().with_url("not a url")).await;
        assert!(matches!(
            result,
            Err(CacheError::BackendUnavailable { .. })
        ));
    }
}
