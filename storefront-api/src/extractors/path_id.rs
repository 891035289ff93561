//! Path extractor for typed entity IDs.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use storefront_core::EntityIdType;
use uuid::Uuid;

use crate::error::ApiError;

/// Extracts a typed id from a single `/:id` path parameter.
///
/// ```rust,ignore
/// async fn get_product(PathId(id): PathId<ProductId>) -> ApiResult<impl IntoResponse> {
///     // id is a ProductId, not a Uuid
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PathId<T: EntityIdType>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: EntityIdType + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(uuid): Path<Uuid> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                ApiError::invalid_format(
                    &format!("{} id", T::ENTITY_TYPE),
                    &format!("UUID ({})", e.body_text()),
                )
            })?;
        Ok(PathId(T::new(uuid)))
    }
}
