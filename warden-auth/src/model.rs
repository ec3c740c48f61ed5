//! User, Role, and Permission entities
//!
//! These are snapshots of the persisted graph: a loaded [`User`] carries its
//! linked roles, and each role carries its linked permissions, hydrated by
//! explicit adjacency queries in the store. Membership has set semantics;
//! the store never produces duplicate links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 hash string; never serialized out of the engine
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<Role>,
}

impl User {
    /// Name suitable for display: full name when present, username otherwise
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

/// A role grouping permissions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// System roles cannot be deleted
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub permissions: Vec<Permission>,
}

/// A single capability, identified by name and by (resource, action)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub resource: String,
    pub action: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

fn default_true() -> bool {
    true
}

/// Partial update for a user; only present fields are applied
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Fields for creating a role
#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_system: bool,
}

/// Partial update for a role; `is_system` is deliberately not updatable
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleUpdate {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Fields for creating a permission
#[derive(Debug, Clone, Deserialize)]
pub struct NewPermission {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub resource: String,
    pub action: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial update for a permission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionUpdate {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
    pub is_active: Option<bool>,
}
