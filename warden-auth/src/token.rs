//! Stateless signed tokens
//!
//! Every token is a self-contained JWT carrying a subject, a purpose tag, and
//! an expiry; validity is determined entirely by signature and embedded
//! claims on each verification call. There is no server-side revocation
//! list: logout is a client-side discard convention.

use crate::error::AuthError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use warden_core::SecurityConfig;

/// Extended lifetimes for "remember me" sessions
const REMEMBER_ACCESS_HOURS: i64 = 24;
const REMEMBER_REFRESH_DAYS: i64 = 30;

/// Fixed lifetimes for out-of-band tokens
const PASSWORD_RESET_HOURS: i64 = 24;
const EMAIL_VERIFICATION_HOURS: i64 = 48;

/// Tag distinguishing token kinds so one can never stand in for another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Access,
    Refresh,
    PasswordReset,
    EmailVerification,
}

impl std::fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenPurpose::Access => write!(f, "access"),
            TokenPurpose::Refresh => write!(f, "refresh"),
            TokenPurpose::PasswordReset => write!(f, "password_reset"),
            TokenPurpose::EmailVerification => write!(f, "email_verification"),
        }
    }
}

/// JWT claims structure
///
/// Access and refresh tokens carry the user id as subject; password-reset
/// and email-verification tokens carry the target email, since the
/// recipient may not be authenticated yet.
#[derive(Debug, Serialize, Deserialize, Clone)]
struct Claims {
    sub: String,
    #[serde(rename = "type")]
    purpose: TokenPurpose,
    exp: i64,
    iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    nbf: Option<i64>,
}

/// Token issuance and verification
///
/// Holds the signing keys and configured lifetimes; constructed once at
/// startup from [`SecurityConfig`] and immutable afterwards.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(security: &SecurityConfig) -> Self {
        let secret = security.secret_key.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        // No clock skew allowance: a token expiring "now" is already invalid
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl: Duration::minutes(security.access_token_expire_minutes),
            refresh_ttl: Duration::days(security.refresh_token_expire_days),
        }
    }

    /// Issue a token for `subject` with the given purpose and lifetime
    pub fn issue(
        &self,
        subject: &str,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let nbf = match purpose {
            TokenPurpose::PasswordReset | TokenPurpose::EmailVerification => {
                Some(now.timestamp())
            }
            _ => None,
        };

        let claims = Claims {
            sub: subject.to_string(),
            purpose,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            nbf,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            warn!(purpose = %purpose, "Failed to encode token: {}", e);
            AuthError::TokenCreation
        })
    }

    /// Verify a token and return its subject.
    ///
    /// Returns `None` (never partial data) when the signature does not match,
    /// the purpose differs from `expected`, the token is expired or not yet
    /// valid, or the payload is malformed.
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Option<String> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| debug!("Token verification failed: {}", e))
            .ok()?;

        let claims = data.claims;
        let now = Utc::now().timestamp();

        if claims.purpose != expected {
            debug!(
                expected = %expected,
                got = %claims.purpose,
                "Token purpose mismatch"
            );
            return None;
        }

        if now >= claims.exp {
            return None;
        }

        if let Some(nbf) = claims.nbf {
            if now < nbf {
                return None;
            }
        }

        Some(claims.sub)
    }

    /// Access token for a user; extended lifetime for remembered sessions
    pub fn issue_access(&self, user_id: i64, remember_me: bool) -> Result<String, AuthError> {
        self.issue(
            &user_id.to_string(),
            TokenPurpose::Access,
            self.access_ttl_for(remember_me),
        )
    }

    /// Refresh token for a user; extended lifetime for remembered sessions
    pub fn issue_refresh(&self, user_id: i64, remember_me: bool) -> Result<String, AuthError> {
        let ttl = if remember_me {
            Duration::days(REMEMBER_REFRESH_DAYS)
        } else {
            self.refresh_ttl
        };
        self.issue(&user_id.to_string(), TokenPurpose::Refresh, ttl)
    }

    /// Password-reset token, addressed to an email
    pub fn issue_password_reset(&self, email: &str) -> Result<String, AuthError> {
        self.issue(
            email,
            TokenPurpose::PasswordReset,
            Duration::hours(PASSWORD_RESET_HOURS),
        )
    }

    /// Email-verification token, addressed to an email
    pub fn issue_email_verification(&self, email: &str) -> Result<String, AuthError> {
        self.issue(
            email,
            TokenPurpose::EmailVerification,
            Duration::hours(EMAIL_VERIFICATION_HOURS),
        )
    }

    fn access_ttl_for(&self, remember_me: bool) -> Duration {
        if remember_me {
            Duration::hours(REMEMBER_ACCESS_HOURS)
        } else {
            self.access_ttl
        }
    }

    /// Access-token lifetime in seconds, as reported to clients
    pub fn access_expires_in(&self, remember_me: bool) -> i64 {
        self.access_ttl_for(remember_me).num_seconds()
    }
}
