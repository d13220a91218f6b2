//! In-process credential store.
//!
//! Backs the server when no database is configured, and every test that
//! needs a store.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{CredentialStore, StoreError, duplicate_email, normalize_email};
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::models::auth::Identity;

#[derive(Debug, Clone)]
struct StoredUser {
    identity: Identity,
    password_hash: String,
    roles: Vec<String>,
}

/// `DashMap`-backed store keyed by identity ID, with a normalized-email index.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<String, StoredUser>,
    emails: DashMap<String, String>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `role` to the identity. Returns `false` if the identity is unknown.
    /// Granting a role twice is a no-op.
    pub fn grant_role(&self, id: &str, role: &str) -> bool {
        match self.users.get_mut(id) {
            Some(mut user) => {
                if !user.roles.iter().any(|r| r == role) {
                    user.roles.push(role.to_string());
                }
                true
            }
            None => false,
        }
    }

    /// Remove `role` from the identity. Returns `false` if the identity is unknown.
    pub fn revoke_role(&self, id: &str, role: &str) -> bool {
        match self.users.get_mut(id) {
            Some(mut user) => {
                user.roles.retain(|r| r != role);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create_identity(&self, email: &str, password: &str) -> Result<Identity, StoreError> {
        let key = normalize_email(email);
        if self.emails.contains_key(&key) {
            return Err(duplicate_email(email));
        }

        let password_hash = hash_password_blocking(password.to_owned()).await?;

        // Re-check under the entry lock: another registration may have won
        // the race while hashing.
        match self.emails.entry(key) {
            Entry::Occupied(_) => Err(duplicate_email(email)),
            Entry::Vacant(slot) => {
                let identity = Identity {
                    id: Uuid::now_v7().to_string(),
                    email: email.trim().to_string(),
                };
                self.users.insert(
                    identity.id.clone(),
                    StoredUser {
                        identity: identity.clone(),
                        password_hash,
                        roles: Vec::new(),
                    },
                );
                slot.insert(identity.id.clone());
                Ok(identity)
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let Some(id) = self.emails.get(&normalize_email(email)).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.users.get(id).map(|user| user.identity.clone()))
    }

    async fn verify_password(
        &self,
        identity: &Identity,
        password: &str,
    ) -> Result<bool, StoreError> {
        let Some(hash) = self
            .users
            .get(&identity.id)
            .map(|user| user.password_hash.clone())
        else {
            return Ok(false);
        };
        Ok(verify_password_blocking(password.to_owned(), hash).await?)
    }

    async fn roles(&self, identity: &Identity) -> Result<Vec<String>, StoreError> {
        Ok(self
            .users
            .get(&identity.id)
            .map(|user| user.roles.clone())
            .unwrap_or_default())
    }
}
