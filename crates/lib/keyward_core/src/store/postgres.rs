//! Postgres-backed credential store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, StoreError, duplicate_email, normalize_email};
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::models::auth::Identity;

/// Credential store over the `users` / `user_roles` tables.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grant a role to a user. Granting an already-held role is a no-op.
    pub async fn grant_role(&self, user_id: &str, role: &str) -> Result<(), StoreError> {
        let Ok(user_id) = Uuid::parse_str(user_id) else {
            return Err(StoreError::Rejected(vec![format!("Unknown user '{user_id}'.")]));
        };
        sqlx::query(
            "INSERT INTO user_roles (user_id, role) VALUES ($1, $2) \
             ON CONFLICT (user_id, role) DO NOTHING",
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Check whether an email is already registered.
    pub async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE normalized_email = $1)",
        )
        .bind(normalize_email(email))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn password_hash(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        let hash = sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hash)
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_identity(&self, email: &str, password: &str) -> Result<Identity, StoreError> {
        if self.email_exists(email).await? {
            return Err(duplicate_email(email));
        }

        let password_hash = hash_password_blocking(password.to_owned()).await?;
        let email = email.trim();

        let inserted = sqlx::query_scalar::<_, String>(
            "INSERT INTO users (email, normalized_email, password_hash) \
             VALUES ($1, $2, $3) RETURNING id::text",
        )
        .bind(email)
        .bind(normalize_email(email))
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(id) => Ok(Identity {
                id,
                email: email.to_string(),
            }),
            // Lost a race with a concurrent registration of the same email.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(duplicate_email(email))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT id::text, email FROM users WHERE normalized_email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, email)| Identity { id, email }))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        // Subjects come from token claims; a non-UUID simply matches nobody.
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(email.map(|email| Identity {
            id: id.to_string(),
            email,
        }))
    }

    async fn verify_password(
        &self,
        identity: &Identity,
        password: &str,
    ) -> Result<bool, StoreError> {
        let Ok(uuid) = Uuid::parse_str(&identity.id) else {
            return Ok(false);
        };
        let Some(hash) = self.password_hash(uuid).await? else {
            return Ok(false);
        };
        Ok(verify_password_blocking(password.to_owned(), hash).await?)
    }

    async fn roles(&self, identity: &Identity) -> Result<Vec<String>, StoreError> {
        let Ok(uuid) = Uuid::parse_str(&identity.id) else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY granted_at, role",
        )
        .bind(uuid)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
