//! User administration endpoints

use crate::{
    error::ApiError,
    extract::{require_permission, CurrentUser},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use warden_auth::{NewUser, User, UserUpdate};

/// GET /api/users
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<User>>, ApiError> {
    require_permission(&caller, "user:read")?;
    Ok(Json(state.users.list().await?))
}

/// GET /api/users/{id}
pub async fn get(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    require_permission(&caller, "user:read")?;
    Ok(Json(state.users.get(id).await?))
}

/// POST /api/users
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    require_permission(&caller, "user:write")?;
    let user = state.users.create(&new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/users/{id}
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    require_permission(&caller, "user:write")?;
    Ok(Json(state.users.update(id, &update).await?))
}

/// DELETE /api/users/{id}
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_permission(&caller, "user:write")?;
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/users/{id}/roles/{role_id}
pub async fn assign_role(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((id, role_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    require_permission(&caller, "user:write")?;
    state.roles.assign_to_user(id, role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/users/{id}/roles/{role_id}
pub async fn remove_role(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((id, role_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    require_permission(&caller, "user:write")?;
    state.roles.remove_from_user(id, role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
