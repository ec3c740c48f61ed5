//! Administrative operations on the user/role/permission graph
//!
//! Uniqueness is enforced here with exists checks rather than by bubbling
//! database constraint errors, so the memory and SQLite stores behave
//! identically and conflicts name the offending field. Deleting a system
//! role or a system-critical permission is refused outright; that refusal
//! is distinct from "not found".

use crate::error::{AuthError, AuthResult};
use crate::model::{
    NewPermission, NewRole, NewUser, Permission, PermissionUpdate, Role, RoleUpdate, User,
    UserUpdate,
};
use crate::password::hash_password_async;
use crate::store::AuthStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Permissions the engine itself depends on; they cannot be deleted
pub const SYSTEM_PERMISSIONS: [&str; 6] = [
    "user:read",
    "user:write",
    "role:read",
    "role:write",
    "permission:read",
    "permission:write",
];

/// Role management
#[derive(Clone)]
pub struct RoleAdmin {
    store: Arc<dyn AuthStore>,
}

impl RoleAdmin {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: i64) -> AuthResult<Role> {
        self.store
            .role_by_id(id)
            .await?
            .ok_or(AuthError::not_found("role"))
    }

    pub async fn list(&self) -> AuthResult<Vec<Role>> {
        self.store.list_roles().await
    }

    pub async fn create(&self, role: &NewRole) -> AuthResult<Role> {
        if self.store.role_name_exists(&role.name, None).await? {
            return Err(AuthError::conflict("role name"));
        }

        let created = self.store.create_role(role).await?;
        info!(role_id = created.id, name = %created.name, "Role created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, update: &RoleUpdate) -> AuthResult<Role> {
        // Existence first, so a rename of a missing role is NotFound, not Conflict
        let _ = self.get(id).await?;

        if let Some(name) = &update.name {
            if self.store.role_name_exists(name, Some(id)).await? {
                return Err(AuthError::conflict("role name"));
            }
        }

        self.store
            .apply_role_update(id, update)
            .await?
            .ok_or(AuthError::not_found("role"))
    }

    pub async fn delete(&self, id: i64) -> AuthResult<()> {
        let role = self.get(id).await?;
        if role.is_system {
            warn!(role_id = id, name = %role.name, "Refused to delete system role");
            return Err(AuthError::protected("role", role.name));
        }

        self.store.delete_role(id).await?;
        info!(role_id = id, "Role deleted");
        Ok(())
    }

    /// Grant a role to a user; repeating the grant is a no-op
    pub async fn assign_to_user(&self, user_id: i64, role_id: i64) -> AuthResult<()> {
        if self.store.user_by_id(user_id).await?.is_none() {
            return Err(AuthError::not_found("user"));
        }
        let _ = self.get(role_id).await?;

        self.store.link_role_to_user(user_id, role_id).await
    }

    /// Revoke a role from a user; revoking an absent grant is a no-op
    pub async fn remove_from_user(&self, user_id: i64, role_id: i64) -> AuthResult<()> {
        if self.store.user_by_id(user_id).await?.is_none() {
            return Err(AuthError::not_found("user"));
        }
        let _ = self.get(role_id).await?;

        self.store.unlink_role_from_user(user_id, role_id).await
    }

    /// Attach a permission to a role; idempotent
    pub async fn assign_permission(&self, role_id: i64, permission_id: i64) -> AuthResult<()> {
        let _ = self.get(role_id).await?;
        if self.store.permission_by_id(permission_id).await?.is_none() {
            return Err(AuthError::not_found("permission"));
        }

        self.store
            .link_permission_to_role(role_id, permission_id)
            .await
    }

    /// Detach a permission from a role; idempotent
    pub async fn remove_permission(&self, role_id: i64, permission_id: i64) -> AuthResult<()> {
        let _ = self.get(role_id).await?;
        if self.store.permission_by_id(permission_id).await?.is_none() {
            return Err(AuthError::not_found("permission"));
        }

        self.store
            .unlink_permission_from_role(role_id, permission_id)
            .await
    }
}

/// Permission management
#[derive(Clone)]
pub struct PermissionAdmin {
    store: Arc<dyn AuthStore>,
}

impl PermissionAdmin {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: i64) -> AuthResult<Permission> {
        self.store
            .permission_by_id(id)
            .await?
            .ok_or(AuthError::not_found("permission"))
    }

    pub async fn list(&self) -> AuthResult<Vec<Permission>> {
        self.store.list_permissions().await
    }

    pub async fn create(&self, permission: &NewPermission) -> AuthResult<Permission> {
        if self
            .store
            .permission_name_exists(&permission.name, None)
            .await?
        {
            return Err(AuthError::conflict("permission name"));
        }
        if self
            .store
            .resource_action_exists(&permission.resource, &permission.action, None)
            .await?
        {
            return Err(AuthError::conflict("resource/action pair"));
        }

        let created = self.store.create_permission(permission).await?;
        info!(
            permission_id = created.id,
            name = %created.name,
            "Permission created"
        );
        Ok(created)
    }

    pub async fn update(&self, id: i64, update: &PermissionUpdate) -> AuthResult<Permission> {
        let current = self.get(id).await?;

        if let Some(name) = &update.name {
            if self.store.permission_name_exists(name, Some(id)).await? {
                return Err(AuthError::conflict("permission name"));
            }
        }

        if update.resource.is_some() || update.action.is_some() {
            let resource = update.resource.as_deref().unwrap_or(&current.resource);
            let action = update.action.as_deref().unwrap_or(&current.action);
            if self
                .store
                .resource_action_exists(resource, action, Some(id))
                .await?
            {
                return Err(AuthError::conflict("resource/action pair"));
            }
        }

        self.store
            .apply_permission_update(id, update)
            .await?
            .ok_or(AuthError::not_found("permission"))
    }

    pub async fn delete(&self, id: i64) -> AuthResult<()> {
        let permission = self.get(id).await?;
        if SYSTEM_PERMISSIONS.contains(&permission.name.as_str()) {
            warn!(
                permission_id = id,
                name = %permission.name,
                "Refused to delete system permission"
            );
            return Err(AuthError::protected("permission", permission.name));
        }

        self.store.delete_permission(id).await?;
        info!(permission_id = id, "Permission deleted");
        Ok(())
    }
}

/// User account management
///
/// Unlike self-service registration, admin creation surfaces conflicts as
/// errors naming the duplicated field.
#[derive(Clone)]
pub struct UserAdmin {
    store: Arc<dyn AuthStore>,
}

impl UserAdmin {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: i64) -> AuthResult<User> {
        self.store
            .user_by_id(id)
            .await?
            .ok_or(AuthError::not_found("user"))
    }

    pub async fn list(&self) -> AuthResult<Vec<User>> {
        self.store.list_users().await
    }

    pub async fn create(&self, new_user: &NewUser) -> AuthResult<User> {
        if self.store.username_exists(&new_user.username, None).await? {
            return Err(AuthError::conflict("username"));
        }
        if self.store.email_exists(&new_user.email, None).await? {
            return Err(AuthError::conflict("email"));
        }

        let password_hash = hash_password_async(new_user.password.clone()).await?;
        let user = self.store.create_user(new_user, &password_hash).await?;
        info!(user_id = user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub async fn update(&self, id: i64, update: &UserUpdate) -> AuthResult<User> {
        let _ = self.get(id).await?;

        if let Some(username) = &update.username {
            if self.store.username_exists(username, Some(id)).await? {
                return Err(AuthError::conflict("username"));
            }
        }
        if let Some(email) = &update.email {
            if self.store.email_exists(email, Some(id)).await? {
                return Err(AuthError::conflict("email"));
            }
        }

        self.store
            .apply_user_update(id, update)
            .await?
            .ok_or(AuthError::not_found("user"))
    }

    pub async fn delete(&self, id: i64) -> AuthResult<()> {
        if !self.store.delete_user(id).await? {
            return Err(AuthError::not_found("user"));
        }
        info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Overwrite a user's password without knowing the current one
    pub async fn set_password(&self, id: i64, new_password: &str) -> AuthResult<()> {
        let password_hash = hash_password_async(new_password.to_string()).await?;
        if !self.store.set_password(id, &password_hash).await? {
            return Err(AuthError::not_found("user"));
        }
        info!(user_id = id, "Password set by administrator");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn admins() -> (Arc<dyn AuthStore>, UserAdmin, RoleAdmin, PermissionAdmin) {
        let store: Arc<dyn AuthStore> = Arc::new(MemoryStore::new());
        (
            store.clone(),
            UserAdmin::new(store.clone()),
            RoleAdmin::new(store.clone()),
            PermissionAdmin::new(store),
        )
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "pw-for-tests-1".to_string(),
            full_name: None,
            is_active: true,
            is_superuser: false,
        }
    }

    fn new_role(name: &str, is_system: bool) -> NewRole {
        NewRole {
            name: name.to_string(),
            display_name: name.to_string(),
            description: None,
            is_active: true,
            is_system,
        }
    }

    fn new_permission(name: &str, resource: &str, action: &str) -> NewPermission {
        NewPermission {
            name: name.to_string(),
            display_name: name.to_string(),
            description: None,
            resource: resource.to_string(),
            action: action.to_string(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn duplicate_username_and_email_name_the_field() {
        let (_, users, _, _) = admins();
        users.create(&new_user("alice", "alice@example.com")).await.unwrap();

        let by_username = users
            .create(&new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(
            by_username,
            AuthError::Conflict { field: "username" }
        ));

        let by_email = users
            .create(&new_user("alice2", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(by_email, AuthError::Conflict { field: "email" }));
    }

    #[tokio::test]
    async fn admin_can_overwrite_password() {
        let (store, users, _, _) = admins();
        let alice = users.create(&new_user("alice", "alice@example.com")).await.unwrap();

        users.set_password(alice.id, "brand-new-pw-1").await.unwrap();
        let loaded = store.user_by_id(alice.id).await.unwrap().unwrap();
        assert!(crate::password::verify_password(
            "brand-new-pw-1",
            &loaded.password_hash
        ));

        let err = users.set_password(999, "whatever-pw-1").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound { resource: "user" }));
    }

    #[tokio::test]
    async fn update_may_keep_own_unique_values() {
        let (_, users, _, _) = admins();
        let alice = users.create(&new_user("alice", "alice@example.com")).await.unwrap();

        // re-submitting the same username against yourself is not a conflict
        let updated = users
            .update(
                alice.id,
                &UserUpdate {
                    username: Some("alice".to_string()),
                    full_name: Some("Alice L.".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Alice L."));
    }

    #[tokio::test]
    async fn system_role_cannot_be_deleted() {
        let (_, _, roles, _) = admins();
        let admin_role = roles.create(&new_role("admin", true)).await.unwrap();
        let plain_role = roles.create(&new_role("editor", false)).await.unwrap();

        let err = roles.delete(admin_role.id).await.unwrap_err();
        assert!(matches!(err, AuthError::Protected { kind: "role", .. }));

        roles.delete(plain_role.id).await.unwrap();
        let missing = roles.delete(plain_role.id).await.unwrap_err();
        assert!(matches!(missing, AuthError::NotFound { .. }));
    }

    #[tokio::test]
    async fn system_permission_cannot_be_deleted() {
        let (_, _, _, permissions) = admins();
        let critical = permissions
            .create(&new_permission("user:write", "user", "write"))
            .await
            .unwrap();
        let plain = permissions
            .create(&new_permission("doc:read", "doc", "read"))
            .await
            .unwrap();

        let err = permissions.delete(critical.id).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Protected {
                kind: "permission",
                ..
            }
        ));

        permissions.delete(plain.id).await.unwrap();
    }

    #[tokio::test]
    async fn resource_action_pair_is_unique() {
        let (_, _, _, permissions) = admins();
        permissions
            .create(&new_permission("doc:read", "doc", "read"))
            .await
            .unwrap();

        let err = permissions
            .create(&new_permission("doc:view", "doc", "read"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Conflict {
                field: "resource/action pair"
            }
        ));

        // same action on another resource is fine
        permissions
            .create(&new_permission("user:read", "user", "read"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn moving_a_permission_onto_a_taken_pair_conflicts() {
        let (_, _, _, permissions) = admins();
        permissions
            .create(&new_permission("doc:read", "doc", "read"))
            .await
            .unwrap();
        let write = permissions
            .create(&new_permission("doc:write", "doc", "write"))
            .await
            .unwrap();

        let err = permissions
            .update(
                write.id,
                &PermissionUpdate {
                    action: Some("read".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));
    }

    #[tokio::test]
    async fn role_assignment_is_idempotent_and_checked() {
        let (store, users, roles, _) = admins();
        let alice = users.create(&new_user("alice", "alice@example.com")).await.unwrap();
        let editor = roles.create(&new_role("editor", false)).await.unwrap();

        roles.assign_to_user(alice.id, editor.id).await.unwrap();
        roles.assign_to_user(alice.id, editor.id).await.unwrap();

        let loaded = store.user_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(loaded.roles.len(), 1);

        let err = roles.assign_to_user(999, editor.id).await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound { resource: "user" }));
        let err = roles.assign_to_user(alice.id, 999).await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound { resource: "role" }));

        // removing an absent grant succeeds quietly
        roles.remove_from_user(alice.id, editor.id).await.unwrap();
        roles.remove_from_user(alice.id, editor.id).await.unwrap();
    }

    #[tokio::test]
    async fn renaming_role_onto_taken_name_conflicts() {
        let (_, _, roles, _) = admins();
        roles.create(&new_role("editor", false)).await.unwrap();
        let viewer = roles.create(&new_role("viewer", false)).await.unwrap();

        let err = roles
            .update(
                viewer.id,
                &RoleUpdate {
                    name: Some("editor".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict { field: "role name" }));
    }
}
