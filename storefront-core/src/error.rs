//! Error types for storefront operations

use crate::EntityType;
use thiserror::Error;

/// Origin store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: EntityType, id: String },

    #[error("Insert failed for {entity_type}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: String,
        reason: String,
    },

    #[error("Referenced {entity_type} {id} does not exist")]
    DanglingReference { entity_type: EntityType, id: String },

    #[error("Origin query timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Value for {field} out of range: {reason}")]
    OutOfRange { field: String, reason: String },
}

/// Authorization failures raised by ownership checks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("{entity_type} {id} is not owned by the acting user")]
    NotOwner { entity_type: EntityType, id: String },
}

/// Master error type for all storefront errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorefrontError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),
}

/// Result type alias for storefront operations.
pub type StorefrontResult<T> = Result<T, StorefrontError>;

impl StorefrontError {
    /// Shorthand for a not-found storage error.
    pub fn not_found(entity_type: EntityType, id: impl ToString) -> Self {
        StorageError::NotFound {
            entity_type,
            id: id.to_string(),
        }
        .into()
    }

    /// Returns true if this is a not-found storage error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorefrontError::Storage(StorageError::NotFound { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_helper() {
        let err = StorefrontError::not_found(EntityType::Product, "p1");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Storage error: Entity not found: product with id p1"
        );
    }

    #[test]
    fn test_validation_converts() {
        let err: StorefrontError = ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        }
        .into();
        assert!(!err.is_not_found());
        assert!(matches!(err, StorefrontError::Validation(_)));
    }
}
