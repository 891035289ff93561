//! Acting-user extractor.
//!
//! Authentication happens upstream of this service. The gateway forwards
//! the verified user as `x-user-id` and, optionally, `x-user-role`; an
//! absent role means a buyer.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use storefront_core::{Actor, Role, UserId};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The user a request acts on behalf of.
#[derive(Debug, Clone, Copy)]
pub struct ActingUser(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|s| Some(s.trim()).filter(|s| !s.is_empty()))
            .map_err(|_| ApiError::invalid_format(name, "visible ASCII")),
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ActingUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = header(parts, USER_ID_HEADER)?
            .ok_or_else(|| ApiError::unauthorized(format!("Missing {} header", USER_ID_HEADER)))?;
        let user_id: UserId = raw_id.parse()?;

        let role = match header(parts, USER_ROLE_HEADER)? {
            Some(raw) => raw.parse::<Role>().map_err(ApiError::invalid_input)?,
            None => Role::default(),
        };

        Ok(ActingUser(Actor::new(user_id, role)))
    }
}
