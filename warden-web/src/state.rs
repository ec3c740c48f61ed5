//! Shared application state

use crate::{WebError, WebResult};
use std::sync::Arc;
use tracing::{info, warn};
use warden_auth::{
    AuthService, AuthStore, MemoryStore, NewUser, PermissionAdmin, RoleAdmin, SqliteStore,
    TokenCodec, UserAdmin,
};
use warden_core::Settings;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub auth: AuthService,
    pub users: UserAdmin,
    pub roles: RoleAdmin,
    pub permissions: PermissionAdmin,
}

impl AppState {
    /// Build state backed by the configured database
    pub async fn new(settings: Settings) -> WebResult<Self> {
        settings
            .validate()
            .map_err(|e| WebError::Config(e.to_string()))?;

        let store: Arc<dyn AuthStore> =
            Arc::new(SqliteStore::connect(&settings.database.url).await?);
        let state = Self::with_store(settings, store);
        state.ensure_default_admin().await?;
        Ok(state)
    }

    /// Build state over an in-memory store, for tests
    pub fn for_tests() -> Self {
        Self::with_store(Settings::for_tests(), Arc::new(MemoryStore::new()))
    }

    fn with_store(settings: Settings, store: Arc<dyn AuthStore>) -> Self {
        let codec = TokenCodec::new(&settings.security);
        Self {
            settings: Arc::new(settings),
            auth: AuthService::new(store.clone(), codec),
            users: UserAdmin::new(store.clone()),
            roles: RoleAdmin::new(store.clone()),
            permissions: PermissionAdmin::new(store),
        }
    }

    /// Create the initial superuser when the user table is empty.
    ///
    /// The password comes from `WARDEN_ADMIN_PASSWORD`; without it no account
    /// is created and the deployment starts with an empty user table.
    async fn ensure_default_admin(&self) -> WebResult<()> {
        if !self.users.list().await?.is_empty() {
            return Ok(());
        }

        let Ok(password) = std::env::var("WARDEN_ADMIN_PASSWORD") else {
            warn!("No users exist and WARDEN_ADMIN_PASSWORD is unset; skipping admin bootstrap");
            return Ok(());
        };

        let admin = NewUser {
            username: "admin".to_string(),
            email: "admin@warden.local".to_string(),
            password,
            full_name: Some("Administrator".to_string()),
            is_active: true,
            is_superuser: true,
        };
        let user = self.users.create(&admin).await?;
        info!(user_id = user.id, "Default admin account created");
        Ok(())
    }
}
