//! HTTP request handlers

pub mod auth;
pub mod permissions;
pub mod roles;
pub mod users;

use crate::{extract::OptionalUser, AppState};
use axum::{extract::State, response::Json};
use serde_json::{json, Value};

/// Health check endpoint; reports the caller's identity when a valid
/// token is presented and stays anonymous otherwise
pub async fn health_check(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "warden-web",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "server": state.settings.address(),
        "authenticated_as": user.map(|u| u.username),
    }))
}
