//! Claim set construction.

use uuid::Uuid;

use crate::models::auth::{ClaimSet, Identity};

/// Builds the claim set for a fresh token: subject, email, a random `jti`,
/// and one role entry per role, in the order the store returned them.
pub fn build_claim_set(identity: &Identity, roles: Vec<String>) -> ClaimSet {
    ClaimSet {
        sub: identity.id.clone(),
        email: identity.email.clone(),
        jti: Uuid::new_v4().to_string(),
        roles,
    }
}
