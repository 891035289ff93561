//! Storefront API - REST Layer over the Cached Catalog
//!
//! Axum routes for products, categories, reviews, users and orders. Every
//! read goes through the tag-invalidated cache in `storefront-storage`;
//! every committed write invalidates what it touched.

pub mod config;
pub mod error;
pub mod extractors;
pub mod macros;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::{ApiConfig, CacheBackendKind};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use services::CatalogService;
pub use state::AppState;
pub use types::ApiResponse;
