//! Self-service authentication endpoints
//!
//! Password-reset and email-verification requests always answer 200 with the
//! same message so responses cannot be used to enumerate accounts. The
//! issued tokens would be delivered out of band by a mailer; this service
//! only mints and consumes them.

use crate::{error::ApiError, extract::CurrentUser, AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use warden_auth::{LoginResponse, NewUser, RefreshedToken, UserSummary};

const MIN_PASSWORD_LEN: usize = 8;

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserSummary>), ApiError> {
    if request.username.is_empty() || request.email.is_empty() {
        return Err(ApiError::Validation(
            "Username and email are required".to_string(),
        ));
    }
    check_password(&request.password)?;

    // Self-registration never grants elevated flags
    let new_user = NewUser {
        username: request.username,
        email: request.email,
        password: request.password,
        full_name: request.full_name,
        is_active: true,
        is_superuser: false,
    };

    let user = state
        .auth
        .register(&new_user)
        .await?
        .ok_or(ApiError::Conflict {
            field: "username or email",
        })?;

    let summary = state.auth.summarize(&user).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    state
        .auth
        .login(&request.identifier, &request.password, request.remember_me)
        .await?
        .map(Json)
        .ok_or(ApiError::InvalidCredentials)
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshedToken>, ApiError> {
    state
        .auth
        .refresh(&request.refresh_token)
        .await?
        .map(Json)
        .ok_or(ApiError::InvalidToken)
}

/// POST /api/auth/logout
///
/// Tokens are stateless, so logout is a client-side discard; this endpoint
/// exists so clients have a uniform place to end a session.
pub async fn logout(CurrentUser(user): CurrentUser) -> Json<Value> {
    debug!(user_id = user.id, "User logged out");
    Json(json!({ "message": "Logged out" }))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserSummary>, ApiError> {
    let summary = state.auth.summarize(&user).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// POST /api/auth/password/change
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    check_password(&request.new_password)?;

    let changed = state
        .auth
        .change_password(user.id, &request.current_password, &request.new_password)
        .await?;
    if !changed {
        return Err(ApiError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }

    Ok(Json(json!({ "message": "Password changed" })))
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

/// POST /api/auth/password/reset/request
///
/// Responds identically whether or not the email belongs to an account.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<Value>, ApiError> {
    let _token = state.auth.request_password_reset(&request.email).await?;

    Ok(Json(json!({
        "message": "If the email is registered, a reset link has been sent"
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// POST /api/auth/password/reset/confirm
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    check_password(&request.new_password)?;

    if !state
        .auth
        .reset_password(&request.token, &request.new_password)
        .await?
    {
        return Err(ApiError::InvalidToken);
    }

    Ok(Json(json!({ "message": "Password has been reset" })))
}

/// POST /api/auth/email/verify/request
pub async fn request_email_verification(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<Value>, ApiError> {
    let _token = state
        .auth
        .request_email_verification(&request.email)
        .await?;

    Ok(Json(json!({
        "message": "If the email is registered and unverified, a verification link has been sent"
    })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// POST /api/auth/email/verify/confirm
pub async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<Value>, ApiError> {
    if !state.auth.verify_email(&request.token).await? {
        return Err(ApiError::InvalidToken);
    }

    Ok(Json(json!({ "message": "Email verified" })))
}
