//! Authentication workflows
//!
//! [`AuthService`] ties the store, the password hasher, and the token codec
//! together. Failed authentication is silent: the caller gets `None` with no
//! distinction between unknown identifier, wrong password, or disabled
//! account, so responses cannot be used to probe for accounts.

use crate::error::{AuthError, AuthResult};
use crate::model::{NewUser, User, UserUpdate};
use crate::password::{hash_password_async, verify_password_async};
use crate::resolver::effective_permissions;
use crate::store::AuthStore;
use crate::token::{TokenCodec, TokenPurpose};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Client-facing view of a user, without the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// Successful login payload
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserSummary,
}

/// Fresh access token minted from a refresh token
#[derive(Debug, Clone, Serialize)]
pub struct RefreshedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Authentication service over a pluggable store
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AuthStore>,
    codec: Arc<TokenCodec>,
}

impl AuthService {
    pub fn new(store: Arc<dyn AuthStore>, codec: TokenCodec) -> Self {
        Self {
            store,
            codec: Arc::new(codec),
        }
    }

    pub fn store(&self) -> &Arc<dyn AuthStore> {
        &self.store
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Check credentials and record the login time.
    ///
    /// Returns `None` for unknown identifier, wrong password, or an inactive
    /// account, with no indication of which.
    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> AuthResult<Option<User>> {
        let Some(user) = self.store.user_by_identifier(identifier).await? else {
            debug!("Authentication failed: unknown identifier");
            return Ok(None);
        };

        if !verify_password_async(password.to_string(), user.password_hash.clone()).await {
            debug!(user_id = user.id, "Authentication failed: bad password");
            return Ok(None);
        }

        if !user.is_active {
            warn!(user_id = user.id, "Authentication refused: account inactive");
            return Ok(None);
        }

        self.store.update_last_login(user.id).await?;
        info!(user_id = user.id, "User authenticated");
        Ok(Some(user))
    }

    /// Authenticate and mint an access/refresh token pair
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        remember_me: bool,
    ) -> AuthResult<Option<LoginResponse>> {
        let Some(user) = self.authenticate(identifier, password).await? else {
            return Ok(None);
        };

        let access_token = self.codec.issue_access(user.id, remember_me)?;
        let refresh_token = self.codec.issue_refresh(user.id, remember_me)?;
        let expires_in = self.codec.access_expires_in(remember_me);
        let summary = self.summarize(&user).await?;

        Ok(Some(LoginResponse {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in,
            user: summary,
        }))
    }

    /// Exchange a valid refresh token for a new access token.
    ///
    /// The refresh token itself is not rotated; it stays valid until expiry.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<Option<RefreshedToken>> {
        let Some(user) = self
            .user_from_token(refresh_token, TokenPurpose::Refresh)
            .await?
        else {
            return Ok(None);
        };

        let access_token = self.codec.issue_access(user.id, false)?;
        Ok(Some(RefreshedToken {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.codec.access_expires_in(false),
        }))
    }

    /// Create an account; `None` if the username or email is taken
    pub async fn register(&self, new_user: &NewUser) -> AuthResult<Option<User>> {
        if self.store.username_exists(&new_user.username, None).await?
            || self.store.email_exists(&new_user.email, None).await?
        {
            debug!("Registration refused: identifier already taken");
            return Ok(None);
        }

        let password_hash = hash_password_async(new_user.password.clone()).await?;
        // Two registrations can race past the exists checks; the UNIQUE
        // constraint settles it and the loser gets the duplicate outcome
        let user = match self.store.create_user(new_user, &password_hash).await {
            Ok(user) => user,
            Err(e) if e.is_unique_violation() => {
                debug!("Registration refused: identifier already taken");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(Some(user))
    }

    /// Resolve a bearer access token to its active user
    pub async fn verify_access_token(&self, token: &str) -> AuthResult<Option<User>> {
        self.user_from_token(token, TokenPurpose::Access).await
    }

    /// Issue a password-reset token if the email belongs to a user.
    ///
    /// The caller must respond identically either way; the `None` case exists
    /// only so the token is not minted for addresses we know nothing about.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<Option<String>> {
        if self.store.user_by_email(email).await?.is_none() {
            debug!("Password reset requested for unknown email");
            return Ok(None);
        }

        let token = self.codec.issue_password_reset(email)?;
        info!("Password reset token issued");
        Ok(Some(token))
    }

    /// Consume a reset token and set a new password
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<bool> {
        let Some(email) = self.codec.verify(token, TokenPurpose::PasswordReset) else {
            return Ok(false);
        };
        let Some(user) = self.store.user_by_email(&email).await? else {
            return Ok(false);
        };

        let password_hash = hash_password_async(new_password.to_string()).await?;
        self.store.set_password(user.id, &password_hash).await?;
        info!(user_id = user.id, "Password reset completed");
        Ok(true)
    }

    /// Issue an email-verification token for an unverified account
    pub async fn request_email_verification(&self, email: &str) -> AuthResult<Option<String>> {
        let Some(user) = self.store.user_by_email(email).await? else {
            return Ok(None);
        };
        if user.is_verified {
            return Ok(None);
        }

        Ok(Some(self.codec.issue_email_verification(email)?))
    }

    /// Consume a verification token and mark the account verified
    pub async fn verify_email(&self, token: &str) -> AuthResult<bool> {
        let Some(email) = self.codec.verify(token, TokenPurpose::EmailVerification) else {
            return Ok(false);
        };
        let Some(user) = self.store.user_by_email(&email).await? else {
            return Ok(false);
        };

        let update = UserUpdate {
            is_verified: Some(true),
            ..Default::default()
        };
        self.store.apply_user_update(user.id, &update).await?;
        info!(user_id = user.id, "Email verified");
        Ok(true)
    }

    /// Change a password after proving knowledge of the current one
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<bool> {
        let user = self
            .store
            .user_by_id(user_id)
            .await?
            .ok_or(AuthError::not_found("user"))?;

        if !verify_password_async(current_password.to_string(), user.password_hash.clone()).await {
            debug!(user_id, "Password change refused: current password wrong");
            return Ok(false);
        }

        let password_hash = hash_password_async(new_password.to_string()).await?;
        self.store.set_password(user_id, &password_hash).await?;
        info!(user_id, "Password changed");
        Ok(true)
    }

    /// Build the client-facing summary, including effective permissions
    pub async fn summarize(&self, user: &User) -> AuthResult<UserSummary> {
        let universe = self.store.list_permissions().await?;
        let mut permissions: Vec<String> = effective_permissions(user, &universe)
            .into_iter()
            .collect();
        permissions.sort();

        Ok(UserSummary {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            is_active: user.is_active,
            is_verified: user.is_verified,
            is_superuser: user.is_superuser,
            roles: user.roles.iter().map(|r| r.name.clone()).collect(),
            permissions,
        })
    }

    async fn user_from_token(
        &self,
        token: &str,
        purpose: TokenPurpose,
    ) -> AuthResult<Option<User>> {
        let Some(subject) = self.codec.verify(token, purpose) else {
            return Ok(None);
        };
        let Ok(user_id) = subject.parse::<i64>() else {
            debug!("Token subject is not a user id");
            return Ok(None);
        };

        let Some(user) = self.store.user_by_id(user_id).await? else {
            return Ok(None);
        };
        if !user.is_active {
            return Ok(None);
        }
        Ok(Some(user))
    }
}
