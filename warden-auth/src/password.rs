//! Password hashing with Argon2
//!
//! Hashing is deliberately expensive. Async callers use the `_async`
//! variants, which run the Argon2 work on the blocking pool so a login
//! attempt does not stall unrelated requests.

use crate::error::AuthError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password using Argon2 with a random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Hash)
}

/// Verify a password against a stored hash.
///
/// A malformed hash is a normal negative result, not an error: the stored
/// value simply does not match any password.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// [`hash_password`] on the blocking pool
pub async fn hash_password_async(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|_| AuthError::Hash)?
}

/// [`verify_password`] on the blocking pool
pub async fn verify_password_async(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
    }

    #[test]
    fn wrong_password_rejected() {
        let hash = hash_password("password-one").unwrap();
        assert!(!verify_password("password-two", &hash));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn malformed_hash_is_false_not_error() {
        assert!(!verify_password("anything", "not-a-valid-phc-string"));
        assert!(!verify_password("anything", ""));
    }

    #[tokio::test]
    async fn async_variants_run_off_the_executor() {
        let hash = hash_password_async("off-thread-password".to_string())
            .await
            .unwrap();
        assert!(verify_password_async("off-thread-password".to_string(), hash.clone()).await);
        assert!(!verify_password_async("wrong-password".to_string(), hash).await);
    }
}
