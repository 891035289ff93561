//! Cache backend trait.
//!
//! Backends deal in opaque bytes under canonical [`CacheKey`]s. Encoding,
//! key composition and tag bookkeeping all live above this seam, so a
//! backend only has to store, expire and delete.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::error::CacheResult;
use super::key::CacheKey;

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must be thread-safe. Every failure to reach the backing
/// service is reported as [`CacheError::BackendUnavailable`]; callers
/// degrade rather than fail on it.
///
/// [`CacheError::BackendUnavailable`]: super::error::CacheError::BackendUnavailable
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;

    /// Fetch the bytes stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous entry. The entry
    /// expires after `ttl`.
    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Remove one entry. Returns true if something was removed.
    async fn delete(&self, key: &CacheKey) -> CacheResult<bool>;

    /// Remove every entry in `keys`, returning how many existed.
    async fn delete_many(&self, keys: &[CacheKey]) -> CacheResult<u64>;

    /// Get cache statistics.
    async fn stats(&self) -> CacheResult<CacheStats>;

    /// Release backend resources. Further calls may fail.
    async fn close(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate memory usage in bytes.
    pub memory_bytes: u64,
    /// Number of entries dropped because they expired.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
