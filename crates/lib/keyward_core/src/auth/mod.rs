//! Authentication and token lifecycle.
//!
//! Signing key material, claim construction, token issuance and validation,
//! password hashing, and the [`service::CredentialService`] that orchestrates
//! registration, login and refresh.

pub mod claims;
pub mod issuer;
pub mod keys;
pub mod password;
pub mod service;
pub mod settings;
pub mod validator;

use thiserror::Error;

use crate::store::StoreError;

/// Authentication errors surfaced by the credential service.
///
/// Token validation failures never appear here with their specific kind:
/// they are collapsed into [`AuthError::InvalidToken`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login attempt")]
    InvalidCredentials,

    #[error("Invalid token or refresh token")]
    InvalidToken,

    #[error("Validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Rejected(errors) => AuthError::Validation(errors),
            StoreError::Db(e) => AuthError::DbError(e),
            StoreError::Internal(msg) => AuthError::Internal(msg),
        }
    }
}
