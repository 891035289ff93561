//! Process-local cache backend.
//!
//! Entries carry a deadline on the tokio clock, so tests can drive expiry
//! with paused time. Expired entries are dropped lazily when read, and in
//! bulk by [`InMemoryCacheStore::purge_expired`], which the sweeper task
//! started with [`InMemoryCacheStore::spawn_sweeper`] runs periodically.
//!
//! The store can be switched offline, after which every call fails with
//! `BackendUnavailable`, or given an artificial latency. That is how the
//! degraded-mode and timeout paths of the read and invalidation logic are
//! exercised without a network backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::traits::{CacheStats, CacheStore};

#[derive(Debug)]
struct StoredEntry {
    bytes: Vec<u8>,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory [`CacheStore`].
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, StoredEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    offline: AtomicBool,
    latency_ms: AtomicU64,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, StoredEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, StoredEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_online(&self) -> CacheResult<()> {
        if self.offline.load(Ordering::Acquire) {
            Err(CacheError::unavailable("in-memory store is offline"))
        } else {
            Ok(())
        }
    }

    /// Simulate losing (or regaining) the backend.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Acquire)
    }

    /// Delay every backend call by `latency`. Zero turns the delay off.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::Release);
    }

    async fn simulate_latency(&self) {
        let millis = self.latency_ms.load(Ordering::Acquire);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    /// Purge expired entries every `period` on a background task.
    ///
    /// Lazy expiry only reclaims keys that are read again; the sweeper
    /// bounds memory for keys that never are. The task holds a weak
    /// reference and ends when the store is closed or dropped. Starting a
    /// new sweeper replaces the previous one; a zero period starts nothing.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) {
        if period.is_zero() {
            return;
        }
        let store = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, "Swept expired cache entries");
                }
            }
        });
        if let Some(previous) = self.sweeper_slot().replace(task) {
            previous.abort();
        }
    }

    /// Returns true while a sweeper task is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper_slot()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn sweeper_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.sweeper.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if `key` holds a live entry. Does not touch statistics.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = Instant::now();
        self.read().get(key).is_some_and(|entry| entry.is_live(now))
    }

    /// Keys of all live entries.
    pub fn keys(&self) -> Vec<CacheKey> {
        let now = Instant::now();
        self.read()
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let purged = before - entries.len();
        self.evictions.fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        self.simulate_latency().await;
        self.ensure_online()?;
        let now = Instant::now();

        let expired = match self.read().get(key) {
            Some(entry) if entry.is_live(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.bytes.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            let mut entries = self.write();
            // Re-check: a concurrent set may have refreshed it.
            if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
                entries.remove(key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.simulate_latency().await;
        self.ensure_online()?;
        let entry = StoredEntry {
            bytes: value,
            expires_at: Instant::now() + ttl,
        };
        self.write().insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        self.simulate_latency().await;
        self.ensure_online()?;
        Ok(self.write().remove(key).is_some())
    }

    async fn delete_many(&self, keys: &[CacheKey]) -> CacheResult<u64> {
        self.simulate_latency().await;
        self.ensure_online()?;
        let mut entries = self.write();
        let removed = keys
            .iter()
            .filter(|key| entries.remove(*key).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        self.simulate_latency().await;
        self.ensure_online()?;
        let entries = self.read();
        let memory_bytes = entries
            .iter()
            .map(|(key, entry)| (key.as_str().len() + entry.bytes.len()) as u64)
            .sum();
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: entries.len() as u64,
            memory_bytes,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }

    async fn close(&self) -> CacheResult<()> {
        if let Some(task) = self.sweeper_slot().take() {
            task.abort();
        }
        self.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::{FilterSet, KeyComposer};
    use storefront_core::EntityType;

    fn key(id: &str) -> CacheKey {
        KeyComposer::single(EntityType::Product, id).unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryCacheStore::new();
        store
            .set(&key("p1"), b"{}".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get(&key("p1")).await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(store.get(&key("p2")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_replaces_entry() {
        let store = InMemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        store.set(&key("p1"), b"1".to_vec(), ttl).await.unwrap();
        store.set(&key("p1"), b"2".to_vec(), ttl).await.unwrap();
        assert_eq!(store.get(&key("p1")).await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = InMemoryCacheStore::new();
        store
            .set(&key("p1"), b"x".to_vec(), Duration::from_secs(600))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(store.get(&key("p1")).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get(&key("p1")).await.unwrap().is_none());
        assert!(store.is_empty());
        assert_eq!(store.stats().await.unwrap().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = InMemoryCacheStore::new();
        let list = KeyComposer::collection(EntityType::Product, &FilterSet::new()).unwrap();
        store.set(&key("p1"), b"a".to_vec(), Duration::from_secs(10)).await.unwrap();
        store.set(&list, b"b".to_vec(), Duration::from_secs(100)).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.purge_expired(), 1);
        assert!(store.contains(&list));
        assert!(!store.contains(&key("p1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_reclaims_unread_entries() {
        let store = Arc::new(InMemoryCacheStore::new());
        store.spawn_sweeper(Duration::from_secs(30));
        let list = KeyComposer::collection(
            EntityType::Product,
            &FilterSet::new().text("search", Some("never read again")),
        )
        .unwrap();
        store.set(&key("p1"), b"a".to_vec(), Duration::from_secs(600)).await.unwrap();
        store.set(&list, b"b".to_vec(), Duration::from_secs(10)).await.unwrap();

        // Nothing reads either key; only the sweep can drop the listing.
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(store.len(), 1);
        assert!(store.contains(&key("p1")));
        assert_eq!(store.stats().await.unwrap().evictions, 1);

        store.close().await.unwrap();
        tokio::task::yield_now().await;
        assert!(!store.is_sweeping());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_calls() {
        let store = InMemoryCacheStore::new();
        store.set_latency(Duration::from_secs(2));

        let started = Instant::now();
        assert!(store.get(&key("p1")).await.unwrap().is_none());
        assert!(started.elapsed() >= Duration::from_secs(2));

        store.set_latency(Duration::ZERO);
        let started = Instant::now();
        store.get(&key("p1")).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_delete_many_counts_existing() {
        let store = InMemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        store.set(&key("p1"), b"a".to_vec(), ttl).await.unwrap();
        store.set(&key("p2"), b"b".to_vec(), ttl).await.unwrap();

        let removed = store
            .delete_many(&[key("p1"), key("p2"), key("p3")])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.is_empty());
        assert!(!store.delete(&key("p1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_offline_store_is_unavailable() {
        let store = InMemoryCacheStore::new();
        store.set_offline(true);
        let err = store.get(&key("p1")).await.unwrap_err();
        assert!(err.is_backend_failure());
        assert!(store
            .set(&key("p1"), vec![], Duration::from_secs(1))
            .await
            .is_err());
        assert!(store.delete_many(&[key("p1")]).await.is_err());

        store.set_offline(false);
        assert!(store.get(&key("p1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let store = InMemoryCacheStore::new();
        store
            .set(&key("p1"), b"abc".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        store.get(&key("p1")).await.unwrap();
        store.get(&key("p2")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.memory_bytes, ("product:id:p1".len() + 3) as u64);
    }
}
