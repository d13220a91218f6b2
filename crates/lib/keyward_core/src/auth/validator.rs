//! Access token verification.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Validation, decode};
use thiserror::Error;

use super::keys::SigningKey;
use super::settings::JwtSettings;
use crate::models::auth::{AccessClaims, ClaimSet};

/// Why a token was rejected. Only ever logged; callers see a generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("unexpected signing algorithm")]
    UnexpectedAlgorithm,

    #[error("invalid issuer or audience")]
    InvalidIssuerOrAudience,

    #[error("token expired")]
    Expired,
}

/// Whether validation enforces the `exp` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCheck {
    Enforce,
    /// Used by the refresh flow, which exists to accept expired tokens.
    Ignore,
}

/// Verifies tokens signed by the matching [`super::issuer::TokenIssuer`].
#[derive(Debug, Clone)]
pub struct TokenValidator {
    key: Arc<SigningKey>,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(key: Arc<SigningKey>, settings: &JwtSettings) -> Self {
        // Only the key's algorithm is accepted; anything else fails before
        // the signature is even looked at.
        let mut validation = Validation::new(key.algorithm());
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        // Expiry is checked here rather than by jsonwebtoken so it can be
        // skipped and so the cutoff is exact (no leeway).
        validation.validate_exp = false;
        validation.leeway = 0;
        Self { key, validation }
    }

    /// Validate `token` and return its claim set.
    pub fn validate(&self, token: &str, expiry: ExpiryCheck) -> Result<ClaimSet, TokenError> {
        self.validate_at(token, expiry, Utc::now())
    }

    /// Validate `token` as if the current time were `now`.
    pub fn validate_at(
        &self,
        token: &str,
        expiry: ExpiryCheck,
        now: DateTime<Utc>,
    ) -> Result<ClaimSet, TokenError> {
        self.decode_at(token, expiry, now).map(|payload| payload.claims)
    }

    /// Validate `token` and return the full payload, registered claims included.
    pub fn decode_at(
        &self,
        token: &str,
        expiry: ExpiryCheck,
        now: DateTime<Utc>,
    ) -> Result<AccessClaims, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::Malformed);
        }

        let payload = decode::<AccessClaims>(token, self.key.decoding(), &self.validation)
            .map_err(|e| classify(e.kind()))?
            .claims;

        if expiry == ExpiryCheck::Enforce && now.timestamp() >= payload.exp {
            return Err(TokenError::Expired);
        }
        Ok(payload)
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm => TokenError::UnexpectedAlgorithm,
        ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
            TokenError::InvalidIssuerOrAudience
        }
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
