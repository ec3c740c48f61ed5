//! SQLite-backed store
//!
//! Schema is bootstrapped on construction. Link tables carry composite
//! primary keys, so duplicate links are impossible at the storage level and
//! `INSERT OR IGNORE` keeps link mutations idempotent. Deletes remove
//! dependent links in the same transaction.

use super::AuthStore;
use crate::error::AuthResult;
use crate::model::{
    NewPermission, NewRole, NewUser, Permission, PermissionUpdate, Role, RoleUpdate, User,
    UserUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

const BOOTSTRAP: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        email TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        full_name TEXT,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        is_verified BOOLEAN NOT NULL DEFAULT FALSE,
        is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
        last_login TEXT,
        password_changed_at TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS roles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        display_name TEXT NOT NULL,
        description TEXT,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        is_system BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS permissions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        display_name TEXT NOT NULL,
        description TEXT,
        resource TEXT NOT NULL,
        action TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TEXT NOT NULL,
        UNIQUE(resource, action)
    );

    CREATE TABLE IF NOT EXISTS user_roles (
        user_id INTEGER NOT NULL,
        role_id INTEGER NOT NULL,
        PRIMARY KEY (user_id, role_id)
    );

    CREATE TABLE IF NOT EXISTS role_permissions (
        role_id INTEGER NOT NULL,
        permission_id INTEGER NOT NULL,
        PRIMARY KEY (role_id, permission_id)
    );

    CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);
    CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
    CREATE INDEX IF NOT EXISTS idx_permissions_resource ON permissions(resource, action);
"#;

/// SQLite implementation of [`AuthStore`]
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool, creating tables if needed
    pub async fn new(pool: SqlitePool) -> AuthResult<Self> {
        sqlx::query(BOOTSTRAP).execute(&pool).await?;
        info!("Auth schema ready");
        Ok(Self { pool })
    }

    /// Connect to `url` and bootstrap the schema.
    ///
    /// In-memory databases are pinned to a single connection; each pool
    /// connection would otherwise see its own empty database.
    pub async fn connect(url: &str) -> AuthResult<Self> {
        debug!(url, "Connecting auth store");
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Self::new(pool).await
    }

    fn user_from_row(row: &SqliteRow) -> User {
        User {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            full_name: row.get("full_name"),
            is_active: row.get("is_active"),
            is_verified: row.get("is_verified"),
            is_superuser: row.get("is_superuser"),
            last_login: row.get("last_login"),
            password_changed_at: row.get("password_changed_at"),
            created_at: row.get("created_at"),
            roles: Vec::new(),
        }
    }

    fn role_from_row(row: &SqliteRow) -> Role {
        Role {
            id: row.get("id"),
            name: row.get("name"),
            display_name: row.get("display_name"),
            description: row.get("description"),
            is_active: row.get("is_active"),
            is_system: row.get("is_system"),
            created_at: row.get("created_at"),
            permissions: Vec::new(),
        }
    }

    fn permission_from_row(row: &SqliteRow) -> Permission {
        Permission {
            id: row.get("id"),
            name: row.get("name"),
            display_name: row.get("display_name"),
            description: row.get("description"),
            resource: row.get("resource"),
            action: row.get("action"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        }
    }

    async fn role_permissions(&self, role_id: i64) -> AuthResult<Vec<Permission>> {
        let rows = sqlx::query(
            "SELECT p.* FROM permissions p
             JOIN role_permissions rp ON rp.permission_id = p.id
             WHERE rp.role_id = ? ORDER BY p.id",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::permission_from_row).collect())
    }

    async fn hydrate_role(&self, mut role: Role) -> AuthResult<Role> {
        role.permissions = self.role_permissions(role.id).await?;
        Ok(role)
    }

    async fn hydrate_user(&self, mut user: User) -> AuthResult<User> {
        let rows = sqlx::query(
            "SELECT r.* FROM roles r
             JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = ? ORDER BY r.id",
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        let mut roles = Vec::with_capacity(rows.len());
        for row in &rows {
            roles.push(self.hydrate_role(Self::role_from_row(row)).await?);
        }
        user.roles = roles;
        Ok(user)
    }

    async fn fetch_user(&self, query: &str, bind: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(query)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_user(Self::user_from_row(&row)).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AuthStore for SqliteStore {
    async fn user_by_id(&self, id: i64) -> AuthResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_user(Self::user_from_row(&row)).await?)),
            None => Ok(None),
        }
    }

    async fn user_by_identifier(&self, identifier: &str) -> AuthResult<Option<User>> {
        self.fetch_user(
            "SELECT * FROM users WHERE username = ?1 OR email = ?1",
            identifier,
        )
        .await
    }

    async fn user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        self.fetch_user("SELECT * FROM users WHERE email = ?", email)
            .await
    }

    async fn username_exists(&self, username: &str, exclude: Option<i64>) -> AuthResult<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM users WHERE username = ? AND id != COALESCE(?, -1)",
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn email_exists(&self, email: &str, exclude: Option<i64>) -> AuthResult<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM users WHERE email = ? AND id != COALESCE(?, -1)",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn create_user(&self, user: &NewUser, password_hash: &str) -> AuthResult<User> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users
             (username, email, password_hash, full_name, is_active, is_verified, is_superuser,
              password_changed_at, created_at)
             VALUES (?, ?, ?, ?, ?, FALSE, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(password_hash)
        .bind(&user.full_name)
        .bind(user.is_active)
        .bind(user.is_superuser)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
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
        })
    }

    async fn apply_user_update(&self, id: i64, update: &UserUpdate) -> AuthResult<Option<User>> {
        let result = sqlx::query(
            "UPDATE users SET
                username = COALESCE(?, username),
                email = COALESCE(?, email),
                full_name = COALESCE(?, full_name),
                is_active = COALESCE(?, is_active),
                is_verified = COALESCE(?, is_verified),
                is_superuser = COALESCE(?, is_superuser)
             WHERE id = ?",
        )
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.full_name)
        .bind(update.is_active)
        .bind(update.is_verified)
        .bind(update.is_superuser)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.user_by_id(id).await
    }

    async fn delete_user(&self, id: i64) -> AuthResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_last_login(&self, id: i64) -> AuthResult<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_password(&self, id: i64, password_hash: &str) -> AuthResult<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = ?, password_changed_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self) -> AuthResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            users.push(self.hydrate_user(Self::user_from_row(row)).await?);
        }
        Ok(users)
    }

    async fn role_by_id(&self, id: i64) -> AuthResult<Option<Role>> {
        let row = sqlx::query("SELECT * FROM roles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_role(Self::role_from_row(&row)).await?)),
            None => Ok(None),
        }
    }

    async fn role_name_exists(&self, name: &str, exclude: Option<i64>) -> AuthResult<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM roles WHERE name = ? AND id != COALESCE(?, -1)",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn create_role(&self, role: &NewRole) -> AuthResult<Role> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO roles (name, display_name, description, is_active, is_system, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&role.name)
        .bind(&role.display_name)
        .bind(&role.description)
        .bind(role.is_active)
        .bind(role.is_system)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Role {
            id: result.last_insert_rowid(),
            name: role.name.clone(),
            display_name: role.display_name.clone(),
            description: role.description.clone(),
            is_active: role.is_active,
            is_system: role.is_system,
            created_at: now,
            permissions: Vec::new(),
        })
    }

    async fn apply_role_update(&self, id: i64, update: &RoleUpdate) -> AuthResult<Option<Role>> {
        let result = sqlx::query(
            "UPDATE roles SET
                name = COALESCE(?, name),
                display_name = COALESCE(?, display_name),
                description = COALESCE(?, description),
                is_active = COALESCE(?, is_active)
             WHERE id = ?",
        )
        .bind(&update.name)
        .bind(&update.display_name)
        .bind(&update.description)
        .bind(update.is_active)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.role_by_id(id).await
    }

    async fn delete_role(&self, id: i64) -> AuthResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE role_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_roles(&self) -> AuthResult<Vec<Role>> {
        let rows = sqlx::query("SELECT * FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut roles = Vec::with_capacity(rows.len());
        for row in &rows {
            roles.push(self.hydrate_role(Self::role_from_row(row)).await?);
        }
        Ok(roles)
    }

    async fn permission_by_id(&self, id: i64) -> AuthResult<Option<Permission>> {
        let row = sqlx::query("SELECT * FROM permissions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Self::permission_from_row(&row)))
    }

    async fn permission_name_exists(&self, name: &str, exclude: Option<i64>) -> AuthResult<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM permissions WHERE name = ? AND id != COALESCE(?, -1)",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn resource_action_exists(
        &self,
        resource: &str,
        action: &str,
        exclude: Option<i64>,
    ) -> AuthResult<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM permissions
             WHERE resource = ? AND action = ? AND id != COALESCE(?, -1)",
        )
        .bind(resource)
        .bind(action)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn create_permission(&self, permission: &NewPermission) -> AuthResult<Permission> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO permissions
             (name, display_name, description, resource, action, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&permission.name)
        .bind(&permission.display_name)
        .bind(&permission.description)
        .bind(&permission.resource)
        .bind(&permission.action)
        .bind(permission.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Permission {
            id: result.last_insert_rowid(),
            name: permission.name.clone(),
            display_name: permission.display_name.clone(),
            description: permission.description.clone(),
            resource: permission.resource.clone(),
            action: permission.action.clone(),
            is_active: permission.is_active,
            created_at: now,
        })
    }

    async fn apply_permission_update(
        &self,
        id: i64,
        update: &PermissionUpdate,
    ) -> AuthResult<Option<Permission>> {
        let result = sqlx::query(
            "UPDATE permissions SET
                name = COALESCE(?, name),
                display_name = COALESCE(?, display_name),
                description = COALESCE(?, description),
                resource = COALESCE(?, resource),
                action = COALESCE(?, action),
                is_active = COALESCE(?, is_active)
             WHERE id = ?",
        )
        .bind(&update.name)
        .bind(&update.display_name)
        .bind(&update.description)
        .bind(&update.resource)
        .bind(&update.action)
        .bind(update.is_active)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.permission_by_id(id).await
    }

    async fn delete_permission(&self, id: i64) -> AuthResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE permission_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM permissions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        let rows = sqlx::query("SELECT * FROM permissions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Self::permission_from_row).collect())
    }

    async fn link_role_to_user(&self, user_id: i64, role_id: i64) -> AuthResult<()> {
        sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn unlink_role_from_user(&self, user_id: i64, role_id: i64) -> AuthResult<()> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn link_permission_to_role(&self, role_id: i64, permission_id: i64) -> AuthResult<()> {
        sqlx::query("INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?, ?)")
            .bind(role_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn unlink_permission_from_role(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> AuthResult<()> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = ? AND permission_id = ?")
            .bind(role_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn create_and_load_hydrates_roles() {
        let store = store().await;

        let user = store
            .create_user(
                &NewUser {
                    username: "alice".to_string(),
                    email: "alice@example.com".to_string(),
                    password: "irrelevant".to_string(),
                    full_name: Some("Alice".to_string()),
                    is_active: true,
                    is_superuser: false,
                },
                "hash",
            )
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

        let perm = store
            .create_permission(&NewPermission {
                name: "doc:write".to_string(),
                display_name: "Write documents".to_string(),
                description: None,
                resource: "doc".to_string(),
                action: "write".to_string(),
                is_active: true,
            })
            .await
            .unwrap();

        store
            .link_permission_to_role(role.id, perm.id)
            .await
            .unwrap();
        store.link_role_to_user(user.id, role.id).await.unwrap();

        let loaded = store.user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.roles.len(), 1);
        assert_eq!(loaded.roles[0].permissions.len(), 1);
        assert_eq!(loaded.roles[0].permissions[0].name, "doc:write");
    }

    #[tokio::test]
    async fn link_is_idempotent_under_composite_key() {
        let store = store().await;
        store.link_role_to_user(1, 2).await.unwrap();
        store.link_role_to_user(1, 2).await.unwrap();

        let rows = sqlx::query("SELECT COUNT(*) as count FROM user_roles")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(rows.get::<i64, _>("count"), 1);
    }

    #[tokio::test]
    async fn deleting_permission_clears_role_links() {
        let store = store().await;
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
        let perm = store
            .create_permission(&NewPermission {
                name: "doc:read".to_string(),
                display_name: "Read documents".to_string(),
                description: None,
                resource: "doc".to_string(),
                action: "read".to_string(),
                is_active: true,
            })
            .await
            .unwrap();
        store
            .link_permission_to_role(role.id, perm.id)
            .await
            .unwrap();

        assert!(store.delete_permission(perm.id).await.unwrap());

        let loaded = store.role_by_id(role.id).await.unwrap().unwrap();
        assert!(loaded.permissions.is_empty());
        assert!(store.permission_by_id(perm.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_flagged_as_unique_violation() {
        let store = store().await;
        let alice = NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "irrelevant".to_string(),
            full_name: None,
            is_active: true,
            is_superuser: false,
        };

        store.create_user(&alice, "hash").await.unwrap();
        let err = store.create_user(&alice, "hash").await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn missing_rows_update_to_none() {
        let store = store().await;
        let outcome = store
            .apply_user_update(999, &UserUpdate::default())
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert!(!store.delete_role(999).await.unwrap());
    }
}
