//! REST API Routes Module
//!
//! Route handlers organized by resource, all served through the
//! cache-aside [`CatalogService`](crate::services::CatalogService):
//! - Catalog CRUD under /api/v1/{products,categories,reviews,users,orders}
//! - Health checks under /health
//! - CORS for browser-based clients

pub mod categories;
pub mod health;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

use std::time::Duration;

use axum::{
    http::{header, header::HeaderName, HeaderValue, Method},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::extractors::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::state::AppState;

// Re-export route creation functions for convenience
pub use categories::create_router as category_router;
pub use health::create_router as health_router;
pub use orders::create_router as order_router;
pub use products::create_router as product_router;
pub use reviews::create_router as review_router;
pub use users::create_router as user_router;

/// Catalog resource routes, mounted under /api/v1.
fn build_entity_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", products::create_router())
        .nest("/categories", categories::create_router())
        .nest("/reviews", reviews::create_router())
        .nest("/users", users::create_router())
        .nest("/orders", orders::create_router())
}

/// Create the complete API router.
///
/// # Middleware Order (outer to inner)
/// 1. CORS - handles preflight requests
/// 2. Trace - one span per request
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    Router::new()
        .nest("/api/v1", build_entity_routes())
        .nest("/health", health::create_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(api_config))
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// Otherwise only configured origins, including `*.domain` wildcards.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_ROLE_HEADER),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let config = config.clone();
        cors.allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &axum::http::request::Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| config.is_origin_allowed(origin))
            },
        ))
    }
}
