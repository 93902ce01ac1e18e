//! Argon2id password hashing.
//!
//! Hashes are stored as PHC strings, so parameters travel with each hash.

use std::sync::LazyLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error as HashFailure, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHash};
use thiserror::Error;

/// Password hashing failures.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Argon2 refused to hash the input.
    #[error("failed to hash password: {0}")]
    HashError(String),

    /// Verification failed for a reason other than a mismatch.
    #[error("failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a PHC string.
    #[error("invalid password hash format")]
    InvalidHash,
}

/// Hash checked when a login names an unknown account.
static DECOY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("decoy-password-for-unknown-accounts").ok());

/// Hashes a password with a fresh salt and returns the PHC string.
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails.
///
/// # Example
///
/// ```
/// use loyalty_core::auth::hash_password;
///
/// let hash = hash_password("points-for-coffee").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;
    Ok(hash.to_string())
}

/// Checks a password against a stored PHC hash.
///
/// A wrong password is `Ok(false)`.
///
/// # Errors
///
/// `InvalidHash` for a malformed stored hash, `VerifyError` for anything else
/// Argon2 reports.
///
/// # Example
///
/// ```
/// use loyalty_core::auth::{hash_password, verify_password};
///
/// let hash = hash_password("points-for-coffee").unwrap();
/// assert!(verify_password("points-for-coffee", &hash).unwrap());
/// assert!(!verify_password("points-for-tea", &hash).unwrap());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashFailure::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Spends the same work as a real verification and always fails.
///
/// Login calls this for unknown emails so response time does not reveal
/// which accounts exist.
pub fn verify_against_decoy(password: &str) -> bool {
    if let Some(hash) = DECOY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    false
}
