//! Query-string filter extractor.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Deserializes a list filter from the query string, rejecting with the
/// standard error body instead of axum's plain-text one.
#[derive(Debug, Clone, Default)]
pub struct Filter<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Filter<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(filter) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_input(e.body_text()))?;
        Ok(Filter(filter))
    }
}
