//! Order REST API Routes
//!
//! Every order route acts on behalf of a user. There is no delete; orders
//! are cancelled through a status change.

use axum::{extract::State, response::IntoResponse, Json, Router};
use storefront_core::{CreateOrderRequest, OrderFilter, OrderId, UpdateOrderStatusRequest};

use crate::error::ApiResult;
use crate::extractors::{ActingUser, Filter, PathId};
use crate::services::CatalogService;
use crate::state::AppState;
use crate::types::ApiResponse;

/// POST /api/v1/orders
pub async fn create_order(
    State(catalog): State<CatalogService>,
    ActingUser(actor): ActingUser,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let order = catalog.create_order(&actor, &req).await?;
    Ok(ApiResponse::created("Order created successfully", order))
}

/// GET /api/v1/orders?userId=&status=
pub async fn list_orders(
    State(catalog): State<CatalogService>,
    ActingUser(actor): ActingUser,
    Filter(filter): Filter<OrderFilter>,
) -> ApiResult<impl IntoResponse> {
    let read = catalog.list_orders(&actor, &filter).await?;
    Ok(ApiResponse::from_read("Orders", read))
}

/// GET /api/v1/orders/:id
pub async fn get_order(
    State(catalog): State<CatalogService>,
    ActingUser(actor): ActingUser,
    PathId(id): PathId<OrderId>,
) -> ApiResult<impl IntoResponse> {
    let read = catalog.get_order(&actor, id).await?;
    Ok(ApiResponse::from_read("Order", read))
}

/// PATCH /api/v1/orders/:id/status
pub async fn update_order_status(
    State(catalog): State<CatalogService>,
    ActingUser(actor): ActingUser,
    PathId(id): PathId<OrderId>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let order = catalog.update_order_status(&actor, id, req.status).await?;
    Ok(ApiResponse::ok("Order status updated successfully", order))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_order))
        .route("/", axum::routing::get(list_orders))
        .route("/:id", axum::routing::get(get_order))
        .route("/:id/status", axum::routing::patch(update_order_status))
}
