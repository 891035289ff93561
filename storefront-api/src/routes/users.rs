//! User REST API Routes

use axum::{extract::State, response::IntoResponse, Json, Router};
use storefront_core::{CreateUserRequest, UpdateUserRequest, UserFilter, UserId};

use crate::error::ApiResult;
use crate::extractors::{Filter, PathId};
use crate::services::CatalogService;
use crate::state::AppState;
use crate::types::ApiResponse;

/// POST /api/v1/users
pub async fn create_user(
    State(catalog): State<CatalogService>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = catalog.create_user(&req).await?;
    Ok(ApiResponse::created("User created successfully", user))
}

/// GET /api/v1/users?role=
pub async fn list_users(
    State(catalog): State<CatalogService>,
    Filter(filter): Filter<UserFilter>,
) -> ApiResult<impl IntoResponse> {
    let read = catalog.list_users(&filter).await?;
    Ok(ApiResponse::from_read("Users", read))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(catalog): State<CatalogService>,
    PathId(id): PathId<UserId>,
) -> ApiResult<impl IntoResponse> {
    let read = catalog.get_user(id).await?;
    Ok(ApiResponse::from_read("User", read))
}

/// PATCH /api/v1/users/:id
pub async fn update_user(
    State(catalog): State<CatalogService>,
    PathId(id): PathId<UserId>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = catalog.update_user(id, &req).await?;
    Ok(ApiResponse::ok("User updated successfully", user))
}

/// DELETE /api/v1/users/:id
pub async fn delete_user(
    State(catalog): State<CatalogService>,
    PathId(id): PathId<UserId>,
) -> ApiResult<impl IntoResponse> {
    let user = catalog.delete_user(id).await?;
    Ok(ApiResponse::ok("User deleted successfully", user))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_user))
        .route("/", axum::routing::get(list_users))
        .route("/:id", axum::routing::get(get_user))
        .route("/:id", axum::routing::patch(update_user))
        .route("/:id", axum::routing::delete(delete_user))
}
