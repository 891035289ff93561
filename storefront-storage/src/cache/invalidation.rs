//! Invalidation coordinator.
//!
//! Called by the service layer after every committed mutation. Maps the
//! mutation to the tags it affects, empties those tags in the
//! [`TagIndex`] and deletes the keys they held from the backend.
//!
//! Invalidation never fails the write that triggered it. Backend deletes
//! get a bounded number of retries and are then logged and dropped; the
//! affected entries age out by TTL.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storefront_core::EntityType;
use tracing::{debug, info, warn};

use super::config::CachePolicy;
use super::key::{CacheKey, Tag};
use super::tag_index::TagIndex;
use super::traits::CacheStore;

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Created,
    Updated,
    Deleted,
}

impl MutationKind {
    /// Tags a mutation of this kind affects.
    ///
    /// A new entity cannot have cached single reads yet, so creation only
    /// touches the collection tag.
    pub fn affected_tags(self, entity_type: EntityType, id: &str) -> Vec<Tag> {
        match self {
            MutationKind::Created => vec![Tag::collection(entity_type)],
            MutationKind::Updated | MutationKind::Deleted => vec![
                Tag::entity(entity_type, id),
                Tag::collection(entity_type),
            ],
        }
    }
}

/// Outcome of one invalidation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationReport {
    /// Tags emptied.
    pub tags: usize,
    /// Keys removed from the index.
    pub keys_purged: usize,
    /// Entries the backend reported as deleted.
    pub entries_deleted: u64,
    /// False if the backend delete failed after all retries.
    pub backend_ok: bool,
    /// Backend delete attempts made.
    pub attempts: u32,
}

/// Turns committed mutations into tag invalidations.
pub struct InvalidationCoordinator<S: CacheStore + ?Sized = dyn CacheStore> {
    store: Arc<S>,
    index: Arc<TagIndex>,
    policy: CachePolicy,
}

impl<S: CacheStore + ?Sized> Clone for InvalidationCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            index: Arc::clone(&self.index),
            policy: self.policy.clone(),
        }
    }
}

impl<S: CacheStore + ?Sized> InvalidationCoordinator<S> {
    pub fn new(store: Arc<S>, index: Arc<TagIndex>, policy: CachePolicy) -> Self {
        Self {
            store,
            index,
            policy,
        }
    }

    /// Invalidate everything depending on a mutated entity. Call after the
    /// origin commit.
    pub async fn on_mutated(
        &self,
        entity_type: EntityType,
        id: &str,
        kind: MutationKind,
    ) -> InvalidationReport {
        let report = self
            .invalidate_tags(kind.affected_tags(entity_type, id))
            .await;
        info!(
            entity_type = %entity_type,
            id,
            kind = ?kind,
            keys_purged = report.keys_purged,
            backend_ok = report.backend_ok,
            "Cache invalidated after mutation"
        );
        report
    }

    /// Purge every tag of one entity type currently known to the index,
    /// plus its collection tag.
    pub async fn invalidate_entity_type(&self, entity_type: EntityType) -> InvalidationReport {
        let mut tags = self.index.tags_of_type(entity_type);
        tags.push(Tag::collection(entity_type));
        let report = self.invalidate_tags(tags).await;
        info!(
            entity_type = %entity_type,
            tags = report.tags,
            keys_purged = report.keys_purged,
            backend_ok = report.backend_ok,
            "Cache purged for entity type"
        );
        report
    }

    /// Empty `tags` and delete their keys from the backend.
    ///
    /// Runs inside the tags' exclusive section so no populate can register
    /// and write between the index purge and the backend delete.
    pub async fn invalidate_tags(&self, tags: Vec<Tag>) -> InvalidationReport {
        let lease = self.index.track(tags);
        let _section = lease.exclusive().await;

        let mut report = InvalidationReport {
            backend_ok: true,
            ..Default::default()
        };
        let mut keys: Vec<CacheKey> = Vec::new();
        for tag in lease.tags() {
            report.tags += 1;
            keys.extend(self.index.invalidate(tag));
        }
        keys.sort();
        keys.dedup();
        report.keys_purged = keys.len();

        if keys.is_empty() {
            return report;
        }
        self.delete_with_retry(&keys, &mut report).await;
        report
    }

    async fn delete_with_retry(&self, keys: &[CacheKey], report: &mut InvalidationReport) {
        let timeout = self.policy.operation_timeout;
        let max_attempts = self.policy.delete_retries.saturating_add(1);

        while report.attempts < max_attempts {
            report.attempts += 1;
            match tokio::time::timeout(timeout, self.store.delete_many(keys)).await {
                Ok(Ok(deleted)) => {
                    debug!(keys = keys.len(), deleted, "Deleted invalidated cache entries");
                    report.entries_deleted = deleted;
                    report.backend_ok = true;
                    return;
                }
                Ok(Err(e)) => {
                    warn!(
                        attempt = report.attempts,
                        keys = keys.len(),
                        error = %e,
                        "Cache delete failed"
                    );
                }
                Err(_) => {
                    warn!(
                        attempt = report.attempts,
                        keys = keys.len(),
                        timeout_ms = timeout.as_millis() as u64,
                        "Cache delete timed out"
                    );
                }
            }
        }

        report.backend_ok = false;
        warn!(
            keys = keys.len(),
            attempts = report.attempts,
            "Giving up on cache delete; entries will expire by TTL"
        );
    }
}
