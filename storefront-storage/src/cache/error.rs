//! Cache layer errors.

use storefront_core::EntityType;
use thiserror::Error;

/// Errors raised by the cache layer.
///
/// Only `InvalidSelector` ever reaches a caller of the read path. Backend
/// and serialization failures are absorbed: reads degrade to a miss and
/// writes or deletes degrade to a logged no-op.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid selector for {entity_type}: {reason}")]
    InvalidSelector {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Cache backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    #[error("Cache serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Origin load for {entity_type} timed out after {timeout_ms}ms")]
    LoaderTimeout {
        entity_type: EntityType,
        timeout_ms: u64,
    },
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

impl CacheError {
    pub(crate) fn invalid_selector(entity_type: EntityType, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            entity_type,
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(reason: impl ToString) -> Self {
        Self::BackendUnavailable {
            reason: reason.to_string(),
        }
    }

    /// Returns true for failures that mean "treat the backend as absent".
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
