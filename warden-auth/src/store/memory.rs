//! In-memory store for development and testing
//!
//! A single `RwLock` over the whole graph gives each operation the same
//! atomicity a database transaction would: a concurrent reader never
//! observes a half-applied link mutation.

use super::AuthStore;
use crate::error::AuthResult;
use crate::model::{
    NewPermission, NewRole, NewUser, Permission, PermissionUpdate, Role, RoleUpdate, User,
    UserUpdate,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<i64, User>,
    roles: HashMap<i64, Role>,
    permissions: HashMap<i64, Permission>,
    user_roles: HashSet<(i64, i64)>,
    role_permissions: HashSet<(i64, i64)>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn hydrate_role(&self, role: &Role) -> Role {
        let mut permissions: Vec<Permission> = self
            .role_permissions
            .iter()
            .filter(|(rid, _)| *rid == role.id)
            .filter_map(|(_, pid)| self.permissions.get(pid).cloned())
            .collect();
        permissions.sort_by_key(|p| p.id);

        Role {
            permissions,
            ..role.clone()
        }
    }

    fn hydrate_user(&self, user: &User) -> User {
        let mut roles: Vec<Role> = self
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == user.id)
            .filter_map(|(_, rid)| self.roles.get(rid))
            .map(|role| self.hydrate_role(role))
            .collect();
        roles.sort_by_key(|r| r.id);

        User {
            roles,
            ..user.clone()
        }
    }
}

/// In-memory implementation of [`AuthStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn user_by_id(&self, id: i64) -> AuthResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).map(|u| inner.hydrate_user(u)))
    }

    async fn user_by_identifier(&self, identifier: &str) -> AuthResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.username == identifier || u.email == identifier)
            .map(|u| inner.hydrate_user(u)))
    }

    async fn user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.email == email)
            .map(|u| inner.hydrate_user(u)))
    }

    async fn username_exists(&self, username: &str, exclude: Option<i64>) -> AuthResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .any(|u| u.username == username && Some(u.id) != exclude))
    }

    async fn email_exists(&self, email: &str, exclude: Option<i64>) -> AuthResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .any(|u| u.email == email && Some(u.id) != exclude))
    }

    async fn create_user(&self, user: &NewUser, password_hash: &str) -> AuthResult<User> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let created = User {
            id: inner.next_id(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: password_hash.to_string(),
            full_name: user.full_name.clone(),
            is_active: user.is_active,
            is_verified: false,
            is_superuser: user.is_superuser,
            last_login: None,
            password_changed_at: now,
            created_at: now,
            roles: Vec::new(),
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn apply_user_update(&self, id: i64, update: &UserUpdate) -> AuthResult<Option<User>> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(username) = &update.username {
            user.username = username.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(full_name) = &update.full_name {
            user.full_name = Some(full_name.clone());
        }
        if let Some(is_active) = update.is_active {
            user.is_active = is_active;
        }
        if let Some(is_verified) = update.is_verified {
            user.is_verified = is_verified;
        }
        if let Some(is_superuser) = update.is_superuser {
            user.is_superuser = is_superuser;
        }

        let user = user.clone();
        Ok(Some(inner.hydrate_user(&user)))
    }

    async fn delete_user(&self, id: i64) -> AuthResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.users.remove(&id).is_none() {
            return Ok(false);
        }
        inner.user_roles.retain(|(uid, _)| *uid != id);
        Ok(true)
    }

    async fn update_last_login(&self, id: i64) -> AuthResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn set_password(&self, id: i64, password_hash: &str) -> AuthResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        user.password_changed_at = Utc::now();
        Ok(true)
    }

    async fn list_users(&self) -> AuthResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .map(|u| inner.hydrate_user(u))
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn role_by_id(&self, id: i64) -> AuthResult<Option<Role>> {
        let inner = self.inner.read().await;
        Ok(inner.roles.get(&id).map(|r| inner.hydrate_role(r)))
    }

    async fn role_name_exists(&self, name: &str, exclude: Option<i64>) -> AuthResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .roles
            .values()
            .any(|r| r.name == name && Some(r.id) != exclude))
    }

    async fn create_role(&self, role: &NewRole) -> AuthResult<Role> {
        let mut inner = self.inner.write().await;
        let created = Role {
            id: inner.next_id(),
            name: role.name.clone(),
            display_name: role.display_name.clone(),
            description: role.description.clone(),
            is_active: role.is_active,
            is_system: role.is_system,
            created_at: Utc::now(),
            permissions: Vec::new(),
        };
        inner.roles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn apply_role_update(&self, id: i64, update: &RoleUpdate) -> AuthResult<Option<Role>> {
        let mut inner = self.inner.write().await;
        let Some(role) = inner.roles.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            role.name = name.clone();
        }
        if let Some(display_name) = &update.display_name {
            role.display_name = display_name.clone();
        }
        if let Some(description) = &update.description {
            role.description = Some(description.clone());
        }
        if let Some(is_active) = update.is_active {
            role.is_active = is_active;
        }

        let role = role.clone();
        Ok(Some(inner.hydrate_role(&role)))
    }

    async fn delete_role(&self, id: i64) -> AuthResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.roles.remove(&id).is_none() {
            return Ok(false);
        }
        inner.user_roles.retain(|(_, rid)| *rid != id);
        inner.role_permissions.retain(|(rid, _)| *rid != id);
        Ok(true)
    }

    async fn list_roles(&self) -> AuthResult<Vec<Role>> {
        let inner = self.inner.read().await;
        let mut roles: Vec<Role> = inner
            .roles
            .values()
            .map(|r| inner.hydrate_role(r))
            .collect();
        roles.sort_by_key(|r| r.id);
        Ok(roles)
    }

    async fn permission_by_id(&self, id: i64) -> AuthResult<Option<Permission>> {
        let inner = self.inner.read().await;
        Ok(inner.permissions.get(&id).cloned())
    }

    async fn permission_name_exists(&self, name: &str, exclude: Option<i64>) -> AuthResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .permissions
            .values()
            .any(|p| p.name == name && Some(p.id) != exclude))
    }

    async fn resource_action_exists(
        &self,
        resource: &str,
        action: &str,
        exclude: Option<i64>,
    ) -> AuthResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .permissions
            .values()
            .any(|p| p.resource == resource && p.action == action && Some(p.id) != exclude))
    }

    async fn create_permission(&self, permission: &NewPermission) -> AuthResult<Permission> {
        let mut inner = self.inner.write().await;
        let created = Permission {
            id: inner.next_id(),
            name: permission.name.clone(),
            display_name: permission.display_name.clone(),
            description: permission.description.clone(),
            resource: permission.resource.clone(),
            action: permission.action.clone(),
            is_active: permission.is_active,
            created_at: Utc::now(),
        };
        inner.permissions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn apply_permission_update(
        &self,
        id: i64,
        update: &PermissionUpdate,
    ) -> AuthResult<Option<Permission>> {
        let mut inner = self.inner.write().await;
        let Some(permission) = inner.permissions.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            permission.name = name.clone();
        }
        if let Some(display_name) = &update.display_name {
            permission.display_name = display_name.clone();
        }
        if let Some(description) = &update.description {
            permission.description = Some(description.clone());
        }
        if let Some(resource) = &update.resource {
            permission.resource = resource.clone();
        }
        if let Some(action) = &update.action {
            permission.action = action.clone();
        }
        if let Some(is_active) = update.is_active {
            permission.is_active = is_active;
        }

        Ok(Some(permission.clone()))
    }

    async fn delete_permission(&self, id: i64) -> AuthResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.permissions.remove(&id).is_none() {
            return Ok(false);
        }
        inner.role_permissions.retain(|(_, pid)| *pid != id);
        Ok(true)
    }

    async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        let inner = self.inner.read().await;
        let mut permissions: Vec<Permission> = inner.permissions.values().cloned().collect();
        permissions.sort_by_key(|p| p.id);
        Ok(permissions)
    }

    async fn link_role_to_user(&self, user_id: i64, role_id: i64) -> AuthResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_roles.insert((user_id, role_id));
        Ok(())
    }

    async fn unlink_role_from_user(&self, user_id: i64, role_id: i64) -> AuthResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_roles.remove(&(user_id, role_id));
        Ok(())
    }

    async fn link_permission_to_role(&self, role_id: i64, permission_id: i64) -> AuthResult<()> {
        let mut inner = self.inner.write().await;
        inner.role_permissions.insert((role_id, permission_id));
        Ok(())
    }

    async fn unlink_permission_from_role(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> AuthResult<()> {
        let mut inner = self.inner.write().await;
        inner.role_permissions.remove(&(role_id, permission_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "irrelevant".to_string(),
            full_name: None,
            is_active: true,
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn linking_same_role_twice_does_not_duplicate() {
        let store = MemoryStore::new();
        let user = store
            .create_user(&new_user("alice", "alice@example.com"), "hash")
            .await
            .unwrap();
        let role = store
            .create_role(&NewRole {
                name: "editor".to_string(),
                display_name: "Editor".to_string(),
                description: None,
                is_active: true,
                is_system: false,
            })
            .await
            .unwrap();

        store.link_role_to_user(user.id, role.id).await.unwrap();
        store.link_role_to_user(user.id, role.id).await.unwrap();

        let loaded = store.user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.roles.len(), 1);
    }

    #[tokio::test]
    async fn deleting_role_removes_links() {
        let store = MemoryStore::new();
        let user = store
            .create_user(&new_user("bob", "bob@example.com"), "hash")
            .await
            .unwrap();
        let role = store
            .create_role(&NewRole {
                name: "viewer".to_string(),
                display_name: "Viewer".to_string(),
                description: None,
                is_active: true,
                is_system: false,
            })
            .await
            .unwrap();
        store.link_role_to_user(user.id, role.id).await.unwrap();

        assert!(store.delete_role(role.id).await.unwrap());

        let loaded = store.user_by_id(user.id).await.unwrap().unwrap();
        assert!(loaded.roles.is_empty());
    }

    #[tokio::test]
    async fn identifier_lookup_matches_username_and_email() {
        let store = MemoryStore::new();
        store
            .create_user(&new_user("carol", "carol@example.com"), "hash")
            .await
            .unwrap();

        assert!(store.user_by_identifier("carol").await.unwrap().is_some());
        assert!(store
            .user_by_identifier("carol@example.com")
            .await
            .unwrap()
            .is_some());
        assert!(store.user_by_identifier("CAROL").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exists_checks_honor_exclusion() {
        let store = MemoryStore::new();
        let user = store
            .create_user(&new_user("dave", "dave@example.com"), "hash")
            .await
            .unwrap();

        assert!(store.username_exists("dave", None).await.unwrap());
        assert!(!store.username_exists("dave", Some(user.id)).await.unwrap());
    }
}
