//! Password hashing (Argon2id, PHC strings) and strength rules.

use crate::error::{PostboardError, PostboardResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> PostboardResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PostboardError::Internal(anyhow::anyhow!("failed to hash password: {e}")))
}

/// Returns `Ok(false)` on mismatch; errors only when the stored hash is unreadable.
pub fn verify_password(password: &str, hash: &str) -> PostboardResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PostboardError::Internal(anyhow::anyhow!("invalid password hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_strength(password: &str) -> PostboardResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PostboardError::invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(PostboardError::invalid(
            "password must include at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(PostboardError::invalid(
            "password must include at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit() || !c.is_alphanumeric()) {
        return Err(PostboardError::invalid(
            "password must include at least one number or symbol",
        ));
    }
    Ok(())
}
