//! Argon2id password hashing. Hashing is CPU bound, so it runs on the blocking pool.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

use crate::utils::error::{AppError, AppResult};

/// Returns the PHC string (`$argon2id$...`) for `password`.
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::InternalServerError(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| AppError::InternalServerError(format!("password hashing task failed: {e}")))?
}

/// Checks `password` against a stored PHC string. A malformed hash never verifies.
pub async fn verify_password(password: String, stored: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || match PasswordHash::new(&stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
    })
    .await
    .map_err(|e| AppError::InternalServerError(format!("password check task failed: {e}")))
}
