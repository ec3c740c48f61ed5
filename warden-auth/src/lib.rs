//! Warden Auth - authentication and RBAC engine
//!
//! This crate is the security core of the Warden back-office service:
//! credential hashing, stateless signed tokens, permission resolution over
//! the user/role/permission graph, and the administrative operations that
//! keep that graph consistent.
//!
//! It is intentionally decoupled from HTTP; the web boundary lives in
//! `warden-web` and consumes this crate through [`AuthService`], the admin
//! services, and the [`AuthStore`] persistence trait.

pub mod admin;
pub mod error;
pub mod model;
pub mod password;
pub mod resolver;
pub mod service;
pub mod store;
pub mod token;

pub use admin::{PermissionAdmin, RoleAdmin, UserAdmin, SYSTEM_PERMISSIONS};
pub use error::{AuthError, AuthResult};
pub use model::{
    NewPermission, NewRole, NewUser, Permission, PermissionUpdate, Role, RoleUpdate, User,
    UserUpdate,
};
pub use password::{hash_password, hash_password_async, verify_password, verify_password_async};
pub use resolver::{effective_permissions, has_permission, has_role};
pub use service::{AuthService, LoginResponse, RefreshedToken, UserSummary};
pub use store::{AuthStore, MemoryStore, SqliteStore};
pub use token::{TokenCodec, TokenPurpose};
