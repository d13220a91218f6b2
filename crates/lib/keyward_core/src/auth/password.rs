//! Password hashing via bcrypt.
//!
//! bcrypt is CPU-bound by design, so the async helpers run it on tokio's
//! blocking pool instead of the request task.

use std::sync::LazyLock;

use super::AuthError;

/// bcrypt cost factor.
pub const BCRYPT_COST: u32 = 10;

/// bcrypt only reads this many bytes of input; longer passwords are refused
/// rather than truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash compared against when the login email is unknown, so that path costs
/// the same as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| bcrypt::non_truncating_hash("keyward-timing-equalizer", BCRYPT_COST).ok());

/// Build the dummy hash now so the first unknown-email login does not pay
/// for it.
pub fn prepare_dummy_hash() {
    LazyLock::force(&DUMMY_HASH);
}

/// Hash a password with bcrypt (cost 10). Passwords over
/// [`MAX_PASSWORD_BYTES`] are an error.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::non_truncating_hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash. A password too long to have been
/// hashed never matches.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Ok(false);
    }
    bcrypt::non_truncating_verify(password, hash)
        .map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(format!("bcrypt task: {e}")))?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("bcrypt task: {e}")))?
}

/// Burn one bcrypt verification without a real hash to compare against.
pub async fn verify_against_dummy(password: &str) {
    let password = password.to_owned();
    let _ = tokio::task::spawn_blocking(move || {
        if let Some(hash) = DUMMY_HASH.as_deref() {
            let _ = bcrypt::verify(&password, hash);
        }
    })
    .await;
}
