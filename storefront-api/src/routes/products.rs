//! Product REST API Routes

use axum::{extract::State, response::IntoResponse, Json, Router};
use storefront_core::{CreateProductRequest, ProductFilter, ProductId, UpdateProductRequest};

use crate::error::ApiResult;
use crate::extractors::{Filter, PathId};
use crate::services::CatalogService;
use crate::state::AppState;
use crate::types::ApiResponse;

/// POST /api/v1/products
pub async fn create_product(
    State(catalog): State<CatalogService>,
    Json(req): Json<CreateProductRequest>,
) -> ApiResult<impl IntoResponse> {
    let product = catalog.create_product(&req).await?;
    Ok(ApiResponse::created("Product created successfully", product))
}

/// GET /api/v1/products?categoryId=&search=&maxPrice=&minRating=&take=&skip=
pub async fn list_products(
    State(catalog): State<CatalogService>,
    Filter(filter): Filter<ProductFilter>,
) -> ApiResult<impl IntoResponse> {
    let read = catalog.list_products(&filter).await?;
    Ok(ApiResponse::from_read("Products", read))
}

/// GET /api/v1/products/:id
pub async fn get_product(
    State(catalog): State<CatalogService>,
    PathId(id): PathId<ProductId>,
) -> ApiResult<impl IntoResponse> {
    let read = catalog.get_product(id).await?;
    Ok(ApiResponse::from_read("Product", read))
}

/// PATCH /api/v1/products/:id
pub async fn update_product(
    State(catalog): State<CatalogService>,
    PathId(id): PathId<ProductId>,
    Json(req): Json<UpdateProductRequest>,
) -> ApiResult<impl IntoResponse> {
    let product = catalog.update_product(id, &req).await?;
    Ok(ApiResponse::ok("Product updated successfully", product))
}

/// DELETE /api/v1/products/:id
pub async fn delete_product(
    State(catalog): State<CatalogService>,
    PathId(id): PathId<ProductId>,
) -> ApiResult<impl IntoResponse> {
    let product = catalog.delete_product(id).await?;
    Ok(ApiResponse::ok("Product deleted successfully", product))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_product))
        .route("/", axum::routing::get(list_products))
        .route("/:id", axum::routing::get(get_product))
        .route("/:id", axum::routing::patch(update_product))
        .route("/:id", axum::routing::delete(delete_product))
}
