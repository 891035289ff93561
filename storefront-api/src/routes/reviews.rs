//! Review REST API Routes
//!
//! Listing requires `?productId=`. Writes act on behalf of the user named
//! by the gateway headers.

use axum::{extract::State, response::IntoResponse, Json, Router};
use storefront_core::{CreateReviewRequest, ReviewFilter, ReviewId, UpdateReviewRequest};

use crate::error::ApiResult;
use crate::extractors::{ActingUser, Filter, PathId};
use crate::services::CatalogService;
use crate::state::AppState;
use crate::types::ApiResponse;

/// POST /api/v1/reviews
pub async fn create_review(
    State(catalog): State<CatalogService>,
    ActingUser(actor): ActingUser,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let review = catalog.create_review(&actor, &req).await?;
    Ok(ApiResponse::created("Review created successfully", review))
}

/// GET /api/v1/reviews?productId=
pub async fn list_reviews(
    State(catalog): State<CatalogService>,
    Filter(filter): Filter<ReviewFilter>,
) -> ApiResult<impl IntoResponse> {
    let read = catalog.list_reviews(&filter).await?;
    Ok(ApiResponse::from_read("Reviews", read))
}

/// GET /api/v1/reviews/:id
pub async fn get_review(
    State(catalog): State<CatalogService>,
    PathId(id): PathId<ReviewId>,
) -> ApiResult<impl IntoResponse> {
    let read = catalog.get_review(id).await?;
    Ok(ApiResponse::from_read("Review", read))
}

/// PATCH /api/v1/reviews/:id
pub async fn update_review(
    State(catalog): State<CatalogService>,
    ActingUser(actor): ActingUser,
    PathId(id): PathId<ReviewId>,
    Json(req): Json<UpdateReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let review = catalog.update_review(&actor, id, &req).await?;
    Ok(ApiResponse::ok("Review updated successfully", review))
}

/// DELETE /api/v1/reviews/:id
pub async fn delete_review(
    State(catalog): State<CatalogService>,
    ActingUser(actor): ActingUser,
    PathId(id): PathId<ReviewId>,
) -> ApiResult<impl IntoResponse> {
    let review = catalog.delete_review(&actor, id).await?;
    Ok(ApiResponse::ok("Review deleted successfully", review))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_review))
        .route("/", axum::routing::get(list_reviews))
        .route("/:id", axum::routing::get(get_review))
        .route("/:id", axum::routing::patch(update_review))
        .route("/:id", axum::routing::delete(delete_review))
}
