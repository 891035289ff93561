//! Read-through accessor.
//!
//! Reads consult the cache first and fall back to a caller-supplied origin
//! loader. Values loaded from the origin are registered in the
//! [`TagIndex`] and written back, unless an invalidation for one of their
//! tags landed while the loader was running.
//!
//! The cache is never allowed to fail a read. A backend error, a timeout
//! or an undecodable entry is a miss; a failed write-back is logged and
//! the loaded value is still returned. Only selector errors and origin
//! errors reach the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use storefront_core::EntityType;
use tracing::{debug, warn};

use super::config::{CachePolicy, ReadKind};
use super::error::CacheError;
use super::key::{CacheKey, FilterSet, KeyComposer};
use super::tag_index::{TagIndex, TagLease};
use super::traits::CacheStore;

/// Result of a read, carrying where it came from and when it was cached.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    /// When this value was cached (or fetched from the origin).
    cached_at: DateTime<Utc>,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: true,
        }
    }

    /// Create a new cache read from an origin load (cache miss).
    pub fn from_origin(value: T) -> Self {
        Self {
            value,
            cached_at: Utc::now(),
            was_cache_hit: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// How long ago the value was read from the origin.
    pub fn staleness(&self) -> Duration {
        (Utc::now() - self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// On-the-wire form of a cached value.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredValueRef<'a, T> {
    cached_at: DateTime<Utc>,
    value: &'a T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredValue<T> {
    cached_at: DateTime<Utc>,
    value: T,
}

/// Cache-aside reads for single entities and filtered collections.
///
/// # Example
///
/// ```ignore
/// let read = cache
///     .read_single(EntityType::Product, &id.to_string(), || async {
///         repo.product_get(id).await.map_err(ApiError::from)
///     })
///     .await?;
/// ```
pub struct ReadThroughCache<S: CacheStore + ?Sized = dyn CacheStore> {
    store: Arc<S>,
    index: Arc<TagIndex>,
    policy: CachePolicy,
}

impl<S: CacheStore + ?Sized> Clone for ReadThroughCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            index: Arc::clone(&self.index),
            policy: self.policy.clone(),
        }
    }
}

impl<S: CacheStore + ?Sized> ReadThroughCache<S> {
    pub fn new(store: Arc<S>, index: Arc<TagIndex>, policy: CachePolicy) -> Self {
        Self {
            store,
            index,
            policy,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn index(&self) -> &TagIndex {
        &self.index
    }

    /// Read one entity by id.
    ///
    /// `loader` runs only on a miss. Its `Ok(None)` ("not found") is passed
    /// through and nothing is cached for it.
    pub async fn read_single<T, F, Fut, E>(
        &self,
        entity_type: EntityType,
        id: &str,
        loader: F,
    ) -> Result<Option<CacheRead<T>>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: From<CacheError>,
    {
        let key = KeyComposer::single(entity_type, id)?;
        if let Some(hit) = self.lookup(&key).await {
            return Ok(Some(hit));
        }

        let lease = self.index.track(key.dependencies());
        let Some(value) = self.load(entity_type, loader()).await? else {
            debug!(key = %key, "Origin has no such entity; nothing cached");
            return Ok(None);
        };

        let read = CacheRead::from_origin(value);
        self.populate(&key, &lease, &read, ReadKind::Single).await;
        Ok(Some(read))
    }

    /// Read one filtered collection.
    pub async fn read_collection<T, F, Fut, E>(
        &self,
        entity_type: EntityType,
        filter: &FilterSet,
        loader: F,
    ) -> Result<CacheRead<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        let key = KeyComposer::collection(entity_type, filter)?;
        if let Some(hit) = self.lookup(&key).await {
            return Ok(hit);
        }

        let lease = self.index.track(key.dependencies());
        let value = self.load(entity_type, loader()).await?;

        let read = CacheRead::from_origin(value);
        self.populate(&key, &lease, &read, ReadKind::Collection).await;
        Ok(read)
    }

    /// Try the cache. Every failure mode is a miss.
    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CacheRead<T>> {
        let timeout = self.policy.operation_timeout;
        let bytes = match tokio::time::timeout(timeout, self.store.get(key)).await {
            Ok(Ok(Some(bytes))) => bytes,
            Ok(Ok(None)) => {
                debug!(key = %key, "Cache miss");
                return None;
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Cache read failed, falling back to origin");
                return None;
            }
            Err(_) => {
                warn!(
                    key = %key,
                    timeout_ms = timeout.as_millis() as u64,
                    "Cache read timed out, falling back to origin"
                );
                return None;
            }
        };

        match serde_json::from_slice::<StoredValue<T>>(&bytes) {
            Ok(stored) => {
                debug!(key = %key, "Cache hit");
                Some(CacheRead::from_cache(stored.value, stored.cached_at))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Undecodable cache entry, treating as miss");
                None
            }
        }
    }

    async fn load<R, Fut, E>(&self, entity_type: EntityType, load: Fut) -> Result<R, E>
    where
        Fut: Future<Output = Result<R, E>>,
        E: From<CacheError>,
    {
        let timeout = self.policy.loader_timeout;
        match tokio::time::timeout(timeout, load).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                warn!(entity_type = %entity_type, timeout_ms, "Origin load timed out");
                Err(CacheError::LoaderTimeout {
                    entity_type,
                    timeout_ms,
                }
                .into())
            }
        }
    }

    /// Register then write back. Returns true if the value was cached.
    async fn populate<T: Serialize>(
        &self,
        key: &CacheKey,
        lease: &TagLease<'_>,
        read: &CacheRead<T>,
        kind: ReadKind,
    ) -> bool {
        let stored = StoredValueRef {
            cached_at: read.cached_at(),
            value: read.value(),
        };
        let bytes = match serde_json::to_vec(&stored) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Value cannot be encoded, not caching");
                return false;
            }
        };

        let _section = lease.exclusive().await;
        if !lease.is_current() {
            debug!(key = %key, "Invalidated while loading, not caching");
            return false;
        }

        for tag in lease.tags() {
            self.index.register(tag, key);
        }

        let ttl = self.policy.ttl(key.entity_type(), kind);
        let timeout = self.policy.operation_timeout;
        match tokio::time::timeout(timeout, self.store.set(key, bytes, ttl)).await {
            Ok(Ok(())) => {
                debug!(key = %key, ttl_secs = ttl.as_secs(), "Cached origin value");
                true
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Cache write failed");
                false
            }
            Err(_) => {
                warn!(
                    key = %key,
                    timeout_ms = timeout.as_millis() as u64,
                    "Cache write timed out"
                );
                false
            }
        }
    }
}
