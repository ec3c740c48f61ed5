//! Persistence collaborator for the user/role/permission graph
//!
//! The engine talks to storage exclusively through [`AuthStore`]. Lookups
//! return `Ok(None)` for missing records; only genuine storage faults are
//! errors. Loaded users are fully hydrated (roles and their permissions)
//! via explicit adjacency queries so the consistency boundary stays
//! visible. Link mutations are idempotent at this level.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::AuthResult;
use crate::model::{
    NewPermission, NewRole, NewUser, Permission, PermissionUpdate, Role, RoleUpdate, User,
    UserUpdate,
};
use async_trait::async_trait;

#[async_trait]
pub trait AuthStore: Send + Sync {
    // ---- users ----

    async fn user_by_id(&self, id: i64) -> AuthResult<Option<User>>;

    /// Lookup by username OR email, exact match on the stored value
    async fn user_by_identifier(&self, identifier: &str) -> AuthResult<Option<User>>;

    async fn user_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    async fn username_exists(&self, username: &str, exclude: Option<i64>) -> AuthResult<bool>;

    async fn email_exists(&self, email: &str, exclude: Option<i64>) -> AuthResult<bool>;

    async fn create_user(&self, user: &NewUser, password_hash: &str) -> AuthResult<User>;

    /// Apply present fields of `update`; `Ok(None)` if the user is missing
    async fn apply_user_update(&self, id: i64, update: &UserUpdate) -> AuthResult<Option<User>>;

    async fn delete_user(&self, id: i64) -> AuthResult<bool>;

    async fn update_last_login(&self, id: i64) -> AuthResult<()>;

    /// Store a new password hash and bump the password-changed timestamp
    async fn set_password(&self, id: i64, password_hash: &str) -> AuthResult<bool>;

    async fn list_users(&self) -> AuthResult<Vec<User>>;

    // ---- roles ----

    async fn role_by_id(&self, id: i64) -> AuthResult<Option<Role>>;

    async fn role_name_exists(&self, name: &str, exclude: Option<i64>) -> AuthResult<bool>;

    async fn create_role(&self, role: &NewRole) -> AuthResult<Role>;

    async fn apply_role_update(&self, id: i64, update: &RoleUpdate) -> AuthResult<Option<Role>>;

    async fn delete_role(&self, id: i64) -> AuthResult<bool>;

    async fn list_roles(&self) -> AuthResult<Vec<Role>>;

    // ---- permissions ----

    async fn permission_by_id(&self, id: i64) -> AuthResult<Option<Permission>>;

    async fn permission_name_exists(&self, name: &str, exclude: Option<i64>) -> AuthResult<bool>;

    async fn resource_action_exists(
        &self,
        resource: &str,
        action: &str,
        exclude: Option<i64>,
    ) -> AuthResult<bool>;

    async fn create_permission(&self, permission: &NewPermission) -> AuthResult<Permission>;

    async fn apply_permission_update(
        &self,
        id: i64,
        update: &PermissionUpdate,
    ) -> AuthResult<Option<Permission>>;

    async fn delete_permission(&self, id: i64) -> AuthResult<bool>;

    /// The declared permission universe, used for the superuser case
    async fn list_permissions(&self) -> AuthResult<Vec<Permission>>;

    // ---- links (idempotent) ----

    async fn link_role_to_user(&self, user_id: i64, role_id: i64) -> AuthResult<()>;

    async fn unlink_role_from_user(&self, user_id: i64, role_id: i64) -> AuthResult<()>;

    async fn link_permission_to_role(&self, role_id: i64, permission_id: i64) -> AuthResult<()>;

    async fn unlink_permission_from_role(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> AuthResult<()>;
}
