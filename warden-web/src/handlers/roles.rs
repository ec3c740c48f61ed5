//! Role administration endpoints

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
use warden_auth::{NewRole, Role, RoleUpdate};

/// GET /api/roles
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<Role>>, ApiError> {
    require_permission(&caller, "role:read")?;
    Ok(Json(state.roles.list().await?))
}

/// GET /api/roles/{id}
pub async fn get(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Role>, ApiError> {
    require_permission(&caller, "role:read")?;
    Ok(Json(state.roles.get(id).await?))
}

/// POST /api/roles
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(new_role): Json<NewRole>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    require_permission(&caller, "role:write")?;
    let role = state.roles.create(&new_role).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// PUT /api/roles/{id}
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<RoleUpdate>,
) -> Result<Json<Role>, ApiError> {
    require_permission(&caller, "role:write")?;
    Ok(Json(state.roles.update(id, &update).await?))
}

/// DELETE /api/roles/{id}
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_permission(&caller, "role:write")?;
    state.roles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/roles/{id}/permissions/{permission_id}
pub async fn assign_permission(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((id, permission_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    require_permission(&caller, "role:write")?;
    state.roles.assign_permission(id, permission_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/roles/{id}/permissions/{permission_id}
pub async fn remove_permission(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((id, permission_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    require_permission(&caller, "role:write")?;
    state.roles.remove_permission(id, permission_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
