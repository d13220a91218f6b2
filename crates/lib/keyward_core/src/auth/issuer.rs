//! Access token signing and refresh token generation.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Header, encode};
use rand::{RngCore, rng};

use super::AuthError;
use super::keys::SigningKey;
use super::settings::JwtSettings;
use crate::models::auth::{AccessClaims, ClaimSet, TokenPair};

/// Refresh tokens carry 256 bits of randomness.
const REFRESH_TOKEN_BYTES: usize = 32;

/// Signs access tokens for a fixed issuer, audience and lifetime.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(key: Arc<SigningKey>, settings: &JwtSettings) -> Self {
        Self {
            key,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            lifetime: settings.access_token_lifetime(),
        }
    }

    /// Access token lifetime in seconds, as reported to clients.
    pub fn expires_in(&self) -> i64 {
        self.lifetime.num_seconds()
    }

    /// Issue a signed access token plus a fresh refresh token.
    pub fn issue(&self, claims: ClaimSet) -> Result<TokenPair, AuthError> {
        self.issue_at(claims, Utc::now())
    }

    /// Issue a token pair as if the current time were `now`.
    pub fn issue_at(&self, claims: ClaimSet, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let expires_at = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| AuthError::Internal("token expiry out of range".into()))?;
        let payload = AccessClaims {
            claims,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let access_token = encode(
            &Header::new(self.key.algorithm()),
            &payload,
            self.key.encoding(),
        )
        .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))?;

        Ok(TokenPair {
            access_token,
            refresh_token: generate_refresh_token(),
            expires_in: self.expires_in(),
        })
    }
}

/// Generate an opaque refresh token: 32 CSPRNG bytes, standard base64.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
