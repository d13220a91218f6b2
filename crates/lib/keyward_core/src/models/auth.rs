//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! shapes in `keyward_api::models` (which are camelCase on the wire).

use serde::{Deserialize, Serialize};

/// A registered identity as known to the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Claims describing who a token is about.
///
/// Field order is fixed so serialized payloads are reproducible; roles keep
/// the order in which the credential store enumerated them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Subject: the identity ID.
    pub sub: String,
    pub email: String,
    /// Unique per issued token.
    pub jti: String,
    /// One entry per assigned role.
    #[serde(rename = "role", default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// Full access token payload: the claim set plus registered JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub claims: ClaimSet,
    pub iss: String,
    pub aud: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// An access token, its companion refresh token, and the access lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(roles: &[&str]) -> ClaimSet {
        ClaimSet {
            sub: "u-1".into(),
            email: "alice@example.com".into(),
            jti: "j-1".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn payload_fields_serialize_in_fixed_order() {
        let payload = AccessClaims {
            claims: claims(&["admin", "editor"]),
            iss: "keyward".into(),
            aud: "clients".into(),
            iat: 10,
            exp: 20,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r#"{"sub":"u-1","email":"alice@example.com","jti":"j-1","role":["admin","editor"],"iss":"keyward","aud":"clients","iat":10,"exp":20}"#
        );
    }

    #[test]
    fn empty_roles_are_omitted_and_restored() {
        let json = serde_json::to_value(claims(&[])).unwrap();
        assert!(json.get("role").is_none());

        let back: ClaimSet = serde_json::from_value(json).unwrap();
        assert!(back.roles.is_empty());
    }
}
