//! Tag to key dependency index.
//!
//! The index answers one question for the invalidation path: which cache
//! keys must go when this tag changes. It also owns the per-tag ordering
//! that keeps a populate from resurrecting a value an invalidation just
//! removed.
//!
//! # Ordering
//!
//! Each tag carries a generation counter and an async gate.
//!
//! - A read takes a [`TagLease`] on its key's tags *before* calling the
//!   origin. The lease records each tag's generation.
//! - Both the populate (`register` then backend `set`) and the invalidation
//!   (`invalidate` then backend `delete_many`) run inside
//!   [`TagLease::exclusive`], so they never interleave on a tag.
//! - `invalidate` bumps the generation. A populate that finds a moved
//!   generation inside its section returns the loaded value without
//!   caching it. Invalidation always wins.
//!
//! Entries are pruned once their key set is empty and no lease is
//! outstanding, so a gate is never replaced while someone waits on it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use storefront_core::EntityType;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::key::{CacheKey, Tag};

#[derive(Debug, Default)]
struct TagEntry {
    keys: HashSet<CacheKey>,
    generation: u64,
    leases: usize,
    gate: Arc<AsyncMutex<()>>,
}

impl TagEntry {
    fn is_idle(&self) -> bool {
        self.keys.is_empty() && self.leases == 0
    }
}

/// Process-local mapping from [`Tag`] to the keys that depend on it.
#[derive(Debug, Default)]
pub struct TagIndex {
    entries: Mutex<HashMap<Tag, TagEntry>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // The map is never left half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<Tag, TagEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that `key` depends on `tag`. Idempotent; returns true if the
    /// key was not already registered.
    pub fn register(&self, tag: &Tag, key: &CacheKey) -> bool {
        self.lock()
            .entry(tag.clone())
            .or_default()
            .keys
            .insert(key.clone())
    }

    /// Remove and return every key registered under `tag`.
    pub fn invalidate(&self, tag: &Tag) -> HashSet<CacheKey> {
        let mut entries = self.lock();
        Self::invalidate_locked(&mut entries, tag)
    }

    fn invalidate_locked(entries: &mut HashMap<Tag, TagEntry>, tag: &Tag) -> HashSet<CacheKey> {
        let Some(entry) = entries.get_mut(tag) else {
            return HashSet::new();
        };
        let keys = std::mem::take(&mut entry.keys);
        entry.generation += 1;
        if entry.is_idle() {
            entries.remove(tag);
        }
        keys
    }

    /// Every tag of `entity_type` currently present in the index.
    pub fn tags_of_type(&self, entity_type: EntityType) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .lock()
            .keys()
            .filter(|tag| tag.entity_type() == entity_type)
            .cloned()
            .collect();
        tags.sort();
        tags
    }

    /// Snapshot of the keys registered under `tag`.
    pub fn keys_for(&self, tag: &Tag) -> HashSet<CacheKey> {
        self.lock()
            .get(tag)
            .map(|entry| entry.keys.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, tag: &Tag, key: &CacheKey) -> bool {
        self.lock()
            .get(tag)
            .is_some_and(|entry| entry.keys.contains(key))
    }

    /// Number of tags currently tracked, including tags held only by leases.
    pub fn tag_count(&self) -> usize {
        self.lock().len()
    }

    /// Total registrations across all tags.
    pub fn registration_count(&self) -> usize {
        self.lock().values().map(|entry| entry.keys.len()).sum()
    }

    /// Take a lease on `tags`, recording their current generations.
    ///
    /// Duplicate tags are collapsed. The lease keeps the tags' entries (and
    /// their gates) alive until it is dropped.
    pub fn track(&self, tags: impl IntoIterator<Item = Tag>) -> TagLease<'_> {
        let mut tags: Vec<Tag> = tags.into_iter().collect();
        tags.sort();
        tags.dedup();

        let mut entries = self.lock();
        let held = tags
            .into_iter()
            .map(|tag| {
                let entry = entries.entry(tag.clone()).or_default();
                entry.leases += 1;
                HeldTag {
                    generation: entry.generation,
                    gate: Arc::clone(&entry.gate),
                    tag,
                }
            })
            .collect();

        TagLease { index: self, held }
    }

    fn release(&self, held: &[HeldTag]) {
        let mut entries = self.lock();
        for HeldTag { tag, .. } in held {
            if let Some(entry) = entries.get_mut(tag) {
                entry.leases = entry.leases.saturating_sub(1);
                if entry.is_idle() {
                    entries.remove(tag);
                }
            }
        }
    }
}

#[derive(Debug)]
struct HeldTag {
    tag: Tag,
    generation: u64,
    gate: Arc<AsyncMutex<()>>,
}

/// A read or invalidation in flight on a set of tags.
#[derive(Debug)]
pub struct TagLease<'a> {
    index: &'a TagIndex,
    // Sorted by tag; gates are always acquired in this order.
    held: Vec<HeldTag>,
}

impl TagLease<'_> {
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.held.iter().map(|held| &held.tag)
    }

    /// Returns true if no leased tag has been invalidated since the lease
    /// was taken.
    pub fn is_current(&self) -> bool {
        let entries = self.index.lock();
        self.held.iter().all(|held| {
            entries
                .get(&held.tag)
                .is_some_and(|entry| entry.generation == held.generation)
        })
    }

    /// Wait for exclusive access to every leased tag.
    pub async fn exclusive(&self) -> TagSection {
        let mut guards = Vec::with_capacity(self.held.len());
        for held in &self.held {
            guards.push(Arc::clone(&held.gate).lock_owned().await);
        }
        TagSection { _guards: guards }
    }
}

impl Drop for TagLease<'_> {
    fn drop(&mut self) {
        self.index.release(&self.held);
    }
}

/// Exclusive access to a lease's tags. Released on drop.
#[derive(Debug)]
pub struct TagSection {
    _guards: Vec<OwnedMutexGuard<()>>,
}
