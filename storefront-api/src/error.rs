//! Error Types for the Storefront API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use storefront_core::{AccessError, StorageError, StorefrontError, ValidationError};
use storefront_storage::CacheError;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401, 403)
    // ========================================================================
    /// Request carries no acting user
    Unauthorized,

    /// Acting user may not touch the resource
    Forbidden,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    ValidationFailed,
    InvalidInput,
    MissingField,
    InvalidRange,
    InvalidFormat,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    EntityNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Operation conflicts with current state (stock, dependent rows)
    StateConflict,

    // ========================================================================
    // Server Errors (500, 503, 504)
    // ========================================================================
    InternalError,
    ServiceUnavailable,
    Timeout,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::InvalidRange
            | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,

            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,

            ErrorCode::StateConflict => StatusCode::CONFLICT,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response returned by every endpoint on failure.
///
/// Serializes as `{ "success": false, "code": ..., "message": ..., "details"? }`
/// so clients can branch on `success` the same way for both outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (field errors and the like)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details for the client.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create an InvalidRange error.
    pub fn invalid_range(field: &str, min: impl fmt::Display, max: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidRange,
            format!("Field '{}' must be between {} and {}", field, min, max),
        )
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
    }

    /// Create an EntityNotFound error.
    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} not found", entity_type, id),
        )
    }

    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StateConflict, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Create a Timeout error.
    pub fn timeout(operation: &str) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Operation '{}' timed out", operation),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    #[serde(flatten)]
    error: &'a ApiError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = %self.code, message = %self.message, "Request failed");
        }
        let body = Json(ErrorBody {
            success: false,
            error: &self,
        });
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<StorefrontError> for ApiError {
    fn from(err: StorefrontError) -> Self {
        match err {
            StorefrontError::Storage(e) => e.into(),
            StorefrontError::Validation(e) => e.into(),
            StorefrontError::Access(e) => e.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::NotFound { entity_type, id } => {
                ApiError::entity_not_found(&capitalize(entity_type.as_str()), id)
            }
            StorageError::DanglingReference { .. } => ApiError::invalid_input(err.to_string()),
            StorageError::InsertFailed { .. } | StorageError::UpdateFailed { .. } => {
                ApiError::state_conflict(err.to_string())
            }
            StorageError::Timeout { timeout_ms } => ApiError::timeout("origin store")
                .with_details(serde_json::json!({ "timeoutMs": timeout_ms })),
            StorageError::LockPoisoned => {
                tracing::error!("Origin store lock poisoned");
                ApiError::internal_error("Storage operation failed")
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::RequiredFieldMissing { field } => ApiError::missing_field(&field),
            ValidationError::InvalidValue { .. } => {
                ApiError::validation_failed(err.to_string())
            }
            ValidationError::OutOfRange { .. } => {
                ApiError::new(ErrorCode::InvalidRange, err.to_string())
            }
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        ApiError::forbidden(err.to_string())
    }
}

/// Cache failures that reach a handler. Backend outages never do; the
/// cache layer absorbs them.
impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidSelector { .. } => ApiError::invalid_input(err.to_string()),
            CacheError::LoaderTimeout {
                entity_type,
                timeout_ms,
            } => ApiError::timeout(&format!("load {}", entity_type)).with_details(
                serde_json::json!({ "entityType": entity_type.as_str(), "timeoutMs": timeout_ms }),
            ),
            CacheError::BackendUnavailable { .. } => {
                ApiError::service_unavailable(err.to_string())
            }
            CacheError::Serialization { .. } => {
                tracing::error!(error = %err, "Cache serialization error");
                ApiError::internal_error("Failed to encode response")
            }
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

/// Convert from uuid::Error to ApiError.
impl From<uuid::Error> for ApiError {
    fn from(err: uuid::Error) -> Self {
        ApiError::invalid_format("id", &format!("valid UUID: {}", err))
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::EntityType;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::ValidationFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::EntityNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::StateConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::InternalError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::ServiceUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_api_error_constructors() {
        let err = ApiError::entity_not_found("Product", "123");
        assert_eq!(err.code, ErrorCode::EntityNotFound);
        assert!(err.message.contains("Product"));
        assert!(err.message.contains("123"));

        let err = ApiError::missing_field("name");
        assert_eq!(err.code, ErrorCode::MissingField);
        assert!(err.message.contains("name"));
    }

    #[test]
    fn test_storefront_errors_map_to_codes() {
        let err: ApiError = StorefrontError::not_found(EntityType::Review, "r1").into();
        assert_eq!(err.code, ErrorCode::EntityNotFound);
        assert_eq!(err.message, "Review with id r1 not found");

        let err: ApiError = StorefrontError::from(AccessError::NotOwner {
            entity_type: EntityType::Order,
            id: "o1".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err: ApiError = StorefrontError::from(StorageError::DanglingReference {
            entity_type: EntityType::Category,
            id: "c1".to_string(),
        })
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = StorefrontError::from(StorageError::LockPoisoned).into();
        assert_eq!(err.code, ErrorCode::InternalError);
    }

    #[test]
    fn test_cache_errors_map_to_codes() {
        let err: ApiError = CacheError::LoaderTimeout {
            entity_type: EntityType::Product,
            timeout_ms: 5000,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.message, "Operation 'load product' timed out");
        assert_eq!(
            err.details,
            Some(serde_json::json!({ "entityType": "product", "timeoutMs": 5000 }))
        );

        let err: ApiError = CacheError::InvalidSelector {
            entity_type: EntityType::Product,
            reason: "unknown filter field 'colour'".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::forbidden("Not yours");
        let json = serde_json::to_string(&err)?;

        assert!(json.contains("FORBIDDEN"));
        assert!(json.contains("Not yours"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::internal_error("Connection failed");
        let display = format!("{}", err);

        assert!(display.contains("InternalError"));
        assert!(display.contains("Connection failed"));
    }
}
