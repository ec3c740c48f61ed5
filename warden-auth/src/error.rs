//! Domain error taxonomy for the auth engine
//!
//! Expected negative outcomes (unknown credentials, invalid tokens) are
//! represented as `None` results on the service methods, never as errors.
//! This enum covers the failures a caller must distinguish: conflicts on
//! unique fields, protected-object violations, missing records, and
//! unexpected storage faults.

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// A unique constraint would be violated; `field` names the offender
    #[error("{field} already exists")]
    Conflict { field: &'static str },

    /// Attempt to delete a system role or system-critical permission
    #[error("{kind} '{name}' is protected and cannot be deleted")]
    Protected { kind: &'static str, name: String },

    /// The referenced record does not exist
    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    /// Password hashing failed (malformed parameters, RNG failure)
    #[error("Failed to hash password")]
    Hash,

    /// Token signing failed
    #[error("Failed to create token")]
    TokenCreation,

    /// Unexpected persistence fault; propagated unmodified
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl AuthError {
    pub fn conflict(field: &'static str) -> Self {
        AuthError::Conflict { field }
    }

    pub fn not_found(resource: &'static str) -> Self {
        AuthError::NotFound { resource }
    }

    pub fn protected(kind: &'static str, name: impl Into<String>) -> Self {
        AuthError::Protected {
            kind,
            name: name.into(),
        }
    }

    /// Did a storage fault come from a UNIQUE constraint?
    ///
    /// Lets callers fold a lost insert race into the same outcome the
    /// up-front exists check would have produced.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AuthError::Storage(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}
