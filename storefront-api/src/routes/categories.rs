//! Category REST API Routes

use axum::{extract::State, response::IntoResponse, Json, Router};
use storefront_core::{CategoryId, CreateCategoryRequest, UpdateCategoryRequest};

use crate::error::ApiResult;
use crate::extractors::PathId;
use crate::services::CatalogService;
use crate::state::AppState;
use crate::types::ApiResponse;

/// POST /api/v1/categories
pub async fn create_category(
    State(catalog): State<CatalogService>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let category = catalog.create_category(&req).await?;
    Ok(ApiResponse::created("Category created successfully", category))
}

/// GET /api/v1/categories
pub async fn list_categories(
    State(catalog): State<CatalogService>,
) -> ApiResult<impl IntoResponse> {
    let read = catalog.list_categories().await?;
    Ok(ApiResponse::from_read("Categories", read))
}

/// GET /api/v1/categories/:id
pub async fn get_category(
    State(catalog): State<CatalogService>,
    PathId(id): PathId<CategoryId>,
) -> ApiResult<impl IntoResponse> {
    let read = catalog.get_category(id).await?;
    Ok(ApiResponse::from_read("Category", read))
}

/// PATCH /api/v1/categories/:id
pub async fn update_category(
    State(catalog): State<CatalogService>,
    PathId(id): PathId<CategoryId>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let category = catalog.update_category(id, &req).await?;
    Ok(ApiResponse::ok("Category updated successfully", category))
}

/// DELETE /api/v1/categories/:id
pub async fn delete_category(
    State(catalog): State<CatalogService>,
    PathId(id): PathId<CategoryId>,
) -> ApiResult<impl IntoResponse> {
    let category = catalog.delete_category(id).await?;
    Ok(ApiResponse::ok("Category deleted successfully", category))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_category))
        .route("/", axum::routing::get(list_categories))
        .route("/:id", axum::routing::get(get_category))
        .route("/:id", axum::routing::patch(update_category))
        .route("/:id", axum::routing::delete(delete_category))
}
