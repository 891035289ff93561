//! Tag-invalidated cache-aside layer.
//!
//! Reads go through [`ReadThroughCache`]: cache first, origin loader on a
//! miss, write-back afterwards. Writes are followed by
//! [`InvalidationCoordinator::on_mutated`], which purges every key that
//! depended on the mutated entity.
//!
//! # Dependencies
//!
//! Keys are never deleted by pattern. Each key is registered in the
//! [`TagIndex`] under the tags it depends on:
//!
//! - `product:id:<id>` depends on `product:<id>`
//! - `product:list:...` depends on `product:collection`
//!
//! so any write to any product purges every product collection read,
//! however it was filtered.
//!
//! # Example
//!
//! ```ignore
//! let cache = CacheLayer::new(Arc::new(InMemoryCacheStore::new()), CachePolicy::from_env());
//!
//! let read = cache
//!     .reader()
//!     .read_collection(EntityType::Product, &filter, || async { load().await })
//!     .await?;
//!
//! repo.product_update(id, &req).await?;
//! cache
//!     .invalidator()
//!     .on_mutated(EntityType::Product, &id.to_string(), MutationKind::Updated)
//!     .await;
//! ```

pub mod config;
pub mod error;
pub mod invalidation;
pub mod key;
pub mod memory_backend;
pub mod read_through;
pub mod tag_index;
pub mod traits;

#[cfg(feature = "redis")]
pub mod redis_backend;

use std::sync::Arc;

pub use config::{CachePolicy, ReadKind, TtlPolicy};
pub use error::{CacheError, CacheResult};
pub use invalidation::{InvalidationCoordinator, InvalidationReport, MutationKind};
pub use key::{
    CacheKey, FieldKind, FieldSpec, FilterSchema, FilterSet, FilterValue, KeyComposer, Selector,
    Tag,
};
pub use memory_backend::InMemoryCacheStore;
pub use read_through::{CacheRead, ReadThroughCache};
pub use tag_index::{TagIndex, TagLease, TagSection};
pub use traits::{CacheStats, CacheStore};

#[cfg(feature = "redis")]
pub use redis_backend::{RedisCacheStore, RedisConfig};

/// A backend, its tag index, and the reader and invalidator sharing them.
pub struct CacheLayer<S: CacheStore + ?Sized = dyn CacheStore> {
    reader: ReadThroughCache<S>,
    invalidator: InvalidationCoordinator<S>,
    store: Arc<S>,
    index: Arc<TagIndex>,
}

impl<S: CacheStore + ?Sized> Clone for CacheLayer<S> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            invalidator: self.invalidator.clone(),
            store: Arc::clone(&self.store),
            index: Arc::clone(&self.index),
        }
    }
}

impl CacheLayer {
    /// A type-erased layer over a fresh process-local store.
    pub fn in_memory(policy: CachePolicy) -> Self {
        Self::new(Arc::new(InMemoryCacheStore::new()), policy)
    }
}

impl<S: CacheStore + ?Sized> CacheLayer<S> {
    pub fn new(store: Arc<S>, policy: CachePolicy) -> Self {
        let index = Arc::new(TagIndex::new());
        Self {
            reader: ReadThroughCache::new(Arc::clone(&store), Arc::clone(&index), policy.clone()),
            invalidator: InvalidationCoordinator::new(Arc::clone(&store), Arc::clone(&index), policy),
            store,
            index,
        }
    }

    pub fn reader(&self) -> &ReadThroughCache<S> {
        &self.reader
    }

    pub fn invalidator(&self) -> &InvalidationCoordinator<S> {
        &self.invalidator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn index(&self) -> &TagIndex {
        &self.index
    }

    pub fn policy(&self) -> &CachePolicy {
        self.reader.policy()
    }

    /// Close the backend. Reads keep working against the origin afterwards.
    pub async fn close(&self) -> CacheResult<()> {
        self.store.close().await
    }
}
