//! Service Layer
//!
//! [`CatalogService`] is what route handlers talk to. Reads go through the
//! cache layer with the origin repository as loader; writes commit to the
//! origin first and then invalidate every cache entry that depended on the
//! mutated entity. Ownership checks live here as well.
//!
//! Each resource has its own `impl CatalogService` block in a submodule.

mod categories;
mod orders;
mod products;
mod reviews;
mod users;

use std::sync::Arc;

use storefront_core::EntityType;
use storefront_storage::{CacheLayer, CatalogRepository, InvalidationReport, MutationKind};

/// Catalog operations over an origin repository and its cache.
#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
    cache: CacheLayer,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>, cache: CacheLayer) -> Self {
        Self { repo, cache }
    }

    pub fn repository(&self) -> &dyn CatalogRepository {
        self.repo.as_ref()
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    /// Invalidate after a committed mutation. Never fails.
    async fn committed(
        &self,
        entity_type: EntityType,
        id: impl ToString,
        kind: MutationKind,
    ) -> InvalidationReport {
        self.cache
            .invalidator()
            .on_mutated(entity_type, &id.to_string(), kind)
            .await
    }
}
