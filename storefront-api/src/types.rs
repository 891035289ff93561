//! API Response Types
//!
//! Every successful response is wrapped in [`ApiResponse`], the envelope
//! clients of the catalog have always received:
//! `{ "success": true, "message": ..., "data": ..., "cached": bool }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use storefront_storage::CacheRead;

/// Success envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    /// True when `data` was served from the cache.
    pub cached: bool,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> ApiResponse<T> {
    /// A response built from the origin or a mutation.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            cached: false,
            status: StatusCode::OK,
        }
    }

    /// A 201 response for a created resource.
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(message, data)
        }
    }

    /// A response for a cache-aside read. `what` names the resource, as
    /// in "Product" or "Products".
    pub fn from_read(what: &str, read: CacheRead<T>) -> Self {
        let cached = read.was_cache_hit();
        let message = if cached {
            format!("{} retrieved from cache", what)
        } else {
            format!("{} retrieved successfully", what)
        };
        Self {
            cached,
            ..Self::ok(message, read.into_value())
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
