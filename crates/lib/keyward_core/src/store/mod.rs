//! Credential stores.
//!
//! The credential service only ever talks to a [`CredentialStore`]; the
//! in-memory and Postgres implementations live in the submodules.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::auth::Identity;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Credential store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the operation (duplicate email, policy violation).
    #[error("Rejected: {}", .0.join("; "))]
    Rejected(Vec<String>),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Persistence for identities, password hashes and role assignments.
///
/// Email lookups are case-insensitive.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create an identity with a freshly hashed password.
    async fn create_identity(&self, email: &str, password: &str) -> Result<Identity, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError>;

    /// Compare `password` with the stored hash for `identity`.
    async fn verify_password(&self, identity: &Identity, password: &str)
    -> Result<bool, StoreError>;

    /// Role names assigned to `identity`, in a stable order.
    async fn roles(&self, identity: &Identity) -> Result<Vec<String>, StoreError>;
}

/// Case-insensitive key used for email uniqueness and lookup.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn duplicate_email(email: &str) -> StoreError {
    StoreError::Rejected(vec![format!("Email '{}' is already taken.", email.trim())])
}

impl From<crate::auth::AuthError> for StoreError {
    fn from(e: crate::auth::AuthError) -> Self {
        StoreError::Internal(e.to_string())
    }
}
