//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use storefront_storage::{CacheLayer, CatalogRepository};

use crate::services::CatalogService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Cached catalog operations. Handlers never reach the origin or the
    /// cache except through this.
    pub catalog: CatalogService,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(repo: Arc<dyn CatalogRepository>, cache: CacheLayer) -> Self {
        Self {
            catalog: CatalogService::new(repo, cache),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(CatalogService, catalog);
crate::impl_from_ref!(Instant, start_time);
