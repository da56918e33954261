//! Password hashing and verification.
//!
//! Argon2id with per-hash random salts. Verification failure and parse
//! failure both come back as a plain `false`/error without detail; the
//! login path maps either to the uniform invalid-credentials error.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::AuthError;

/// Hashes a plaintext password for storage.
///
/// # Errors
///
/// Returns `AuthError::Internal` if hashing fails (effectively never for
/// valid parameters).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::internal(format!("failed to hash password: {e}")))
}

/// Verifies a plaintext password against a stored hash.
///
/// Returns `false` for a wrong password or an unparseable hash.
#[must_use]
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
