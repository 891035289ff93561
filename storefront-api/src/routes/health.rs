//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Cache backend reachability and statistics
//!
//! An unreachable cache does not make the service unready: reads fall
//! back to the origin. It is reported as degraded.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use storefront_storage::CacheStats;

use crate::services::CatalogService;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDetails {
    pub cache: CacheHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub backend: &'static str,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CacheStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_rate: Option<f64>,
    /// Distinct tags with at least one registered key.
    pub tags: usize,
    pub tracked_keys: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Cache reachability and statistics
pub async fn readiness(
    State(catalog): State<CatalogService>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let cache = check_cache(&catalog).await;
    let response = HealthResponse {
        status: cache.status,
        message: None,
        details: Some(HealthDetails {
            cache,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };
    (StatusCode::OK, Json(response))
}

async fn check_cache(catalog: &CatalogService) -> CacheHealth {
    let layer = catalog.cache();
    let start = Instant::now();
    let outcome =
        tokio::time::timeout(layer.policy().operation_timeout, layer.store().stats()).await;

    let (status, latency_ms, stats, error) = match outcome {
        Ok(Ok(stats)) => (
            HealthStatus::Healthy,
            Some(start.elapsed().as_millis() as u64),
            Some(stats),
            None,
        ),
        Ok(Err(e)) => (HealthStatus::Degraded, None, None, Some(e.to_string())),
        Err(_) => (
            HealthStatus::Degraded,
            None,
            None,
            Some("Cache stats timed out".to_string()),
        ),
    };

    CacheHealth {
        backend: layer.store().backend_name(),
        status,
        latency_ms,
        hit_rate: stats.as_ref().map(CacheStats::hit_rate),
        stats,
        tags: layer.index().tag_count(),
        tracked_keys: layer.index().registration_count(),
        error,
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
