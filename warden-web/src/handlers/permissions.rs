//! Permission administration endpoints

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
use warden_auth::{NewPermission, Permission, PermissionUpdate};

/// GET /api/permissions
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<Permission>>, ApiError> {
    require_permission(&caller, "permission:read")?;
    Ok(Json(state.permissions.list().await?))
}

/// GET /api/permissions/{id}
pub async fn get(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Permission>, ApiError> {
    require_permission(&caller, "permission:read")?;
    Ok(Json(state.permissions.get(id).await?))
}

/// POST /api/permissions
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(new_permission): Json<NewPermission>,
) -> Result<(StatusCode, Json<Permission>), ApiError> {
    require_permission(&caller, "permission:write")?;
    let permission = state.permissions.create(&new_permission).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

/// PUT /api/permissions/{id}
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<PermissionUpdate>,
) -> Result<Json<Permission>, ApiError> {
    require_permission(&caller, "permission:write")?;
    Ok(Json(state.permissions.update(id, &update).await?))
}

/// DELETE /api/permissions/{id}
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_permission(&caller, "permission:write")?;
    state.permissions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
