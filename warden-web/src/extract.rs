//! Request extractors for authentication and authorization
//!
//! Handlers take [`CurrentUser`] to require a valid bearer token, or
//! [`OptionalUser`] on endpoints that also serve anonymous callers. The
//! permission and role guards run after extraction, against the loaded
//! user snapshot.

use crate::{error::ApiError, AppState};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;
use warden_auth::{has_permission, has_role, User};

/// Authenticated user, rejected with 401 when the token is missing or bad
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = bearer_token(&parts.headers).ok_or(ApiError::InvalidToken)?;
        let user = state
            .auth
            .verify_access_token(token)
            .await
            .map_err(ApiError::from)?
            .ok_or(ApiError::InvalidToken)?;

        Ok(CurrentUser(user))
    }
}

/// Optional user extractor; never fails, anonymous callers get `None`
pub struct OptionalUser(pub Option<User>);

impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(OptionalUser(None));
        };

        match state.auth.verify_access_token(token).await {
            Ok(user) => Ok(OptionalUser(user)),
            Err(_) => Ok(OptionalUser(None)),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
}

/// Require a permission, honoring the superuser bypass
pub fn require_permission(user: &User, permission: &str) -> Result<(), ApiError> {
    if has_permission(user, permission) {
        return Ok(());
    }
    warn!(
        user_id = user.id,
        permission, "Access denied: missing permission"
    );
    Err(ApiError::PermissionDenied {
        required: permission.to_string(),
    })
}

/// Require role membership, honoring the superuser bypass
pub fn require_role(user: &User, role: &str) -> Result<(), ApiError> {
    if has_role(user, role) {
        return Ok(());
    }
    warn!(user_id = user.id, role, "Access denied: missing role");
    Err(ApiError::PermissionDenied {
        required: format!("role:{}", role),
    })
}
