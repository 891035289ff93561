//! Storefront API Server Entry Point
//!
//! Bootstraps telemetry and configuration, connects the cache backend and
//! starts the Axum HTTP server.

use std::sync::Arc;

use axum::Router;
use storefront_api::telemetry::{init_tracing, TelemetryConfig};
use storefront_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState, CacheBackendKind};
use storefront_storage::{CacheLayer, CachePolicy, CacheStore, InMemoryCacheStore, InMemoryCatalog};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let policy = CachePolicy::from_env();
    let store = connect_cache(api_config.cache_backend, &policy).await?;
    let cache = CacheLayer::new(store, policy);

    // The in-memory origin starts empty on every boot.
    let origin = Arc::new(InMemoryCatalog::new());
    let app: Router = create_api_router(AppState::new(origin, cache.clone()), &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(
        %addr,
        cache_backend = cache.store().backend_name(),
        "Starting storefront API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    if let Err(e) = cache.close().await {
        tracing::warn!(error = %e, "Cache backend did not close cleanly");
    }
    Ok(())
}

async fn connect_cache(
    kind: CacheBackendKind,
    policy: &CachePolicy,
) -> ApiResult<Arc<dyn CacheStore>> {
    match kind {
        CacheBackendKind::Memory => {
            let store = Arc::new(InMemoryCacheStore::new());
            store.spawn_sweeper(policy.sweep_interval);
            Ok(store)
        }
        #[cfg(feature = "redis")]
        CacheBackendKind::Redis => {
            let store = storefront_storage::RedisCacheStore::from_env().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        CacheBackendKind::Redis => Err(ApiError::invalid_input(
            "STOREFRONT_CACHE_BACKEND=redis requires building with the `redis` feature",
        )),
    }
}
