//! Caller identity for protected routes.
//!
//! Authentication happens upstream. The gateway forwards the caller's id in
//! the `User-Id` header, and every ledger route is scoped to that id.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use finly_shared::types::UserId;

use crate::ApiError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "user-id";

fn parse_user_id(header: Option<&str>) -> Result<UserId, ApiError> {
    let raw = header.ok_or_else(|| ApiError::unauthorized("User-Id header is required"))?;
    raw.trim()
        .parse::<UserId>()
        .map_err(|_| ApiError::unauthorized("User-Id header is not a valid id"))
}

/// Resolves the caller from the `User-Id` header and stores it in request
/// extensions for [`CallerId`].
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok());

    match parse_user_id(header) {
        Ok(user_id) => {
            request.extensions_mut().insert(user_id);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Extractor for the caller resolved by [`identity_middleware`].
#[derive(Debug, Clone, Copy)]
pub struct CallerId(pub UserId);

impl CallerId {
    /// Returns the caller's user id.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.0
    }
}

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserId>()
            .copied()
            .map(CallerId)
            .ok_or_else(|| ApiError::unauthorized("Caller identity required"))
    }
}
