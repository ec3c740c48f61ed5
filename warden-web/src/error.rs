//! API error responses
//!
//! Every handler error renders as a JSON body with a stable `error` code and
//! a human-readable `message`. Authentication failures are deliberately
//! uninformative; authorization failures name the missing permission.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;
use warden_auth::AuthError;

#[derive(Debug)]
pub enum ApiError {
    /// Login failed; never says why
    InvalidCredentials,
    /// Missing, malformed, expired, or wrong-purpose token
    InvalidToken,
    /// Authenticated but lacking a required permission or role
    PermissionDenied { required: String },
    /// Deletion refused for a protected object
    Protected { kind: &'static str, name: String },
    NotFound { resource: &'static str },
    Conflict { field: &'static str },
    Validation(String),
    Internal,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid credentials".to_string(),
            ),
            ApiError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid or expired token".to_string(),
            ),
            ApiError::PermissionDenied { required } => (
                StatusCode::FORBIDDEN,
                "permission_denied",
                format!("Required permission: {}", required),
            ),
            ApiError::Protected { kind, name } => (
                StatusCode::FORBIDDEN,
                "protected",
                format!("{} '{}' is protected and cannot be deleted", kind, name),
            ),
            ApiError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{} not found", resource),
            ),
            ApiError::Conflict { field } => (
                StatusCode::CONFLICT,
                "conflict",
                format!("{} already exists", field),
            ),
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, "validation", message.clone())
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        (
            status,
            Json(serde_json::json!({
                "error": code,
                "message": message,
            })),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Conflict { field } => ApiError::Conflict { field },
            AuthError::Protected { kind, name } => ApiError::Protected { kind, name },
            AuthError::NotFound { resource } => ApiError::NotFound { resource },
            AuthError::Hash | AuthError::TokenCreation => {
                error!("Auth engine failure: {}", err);
                ApiError::Internal
            }
            AuthError::Storage(e) => {
                error!("Storage failure: {}", e);
                ApiError::Internal
            }
        }
    }
}
