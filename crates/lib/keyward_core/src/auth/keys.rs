//! Signing key material.

use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

use super::settings::ConfigError;

/// The only algorithm tokens are signed with and accepted under.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Symmetric secret plus algorithm, shared read-only by issuer and validator.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    /// Builds key material from a raw secret. An empty secret is a
    /// configuration fault.
    pub fn from_secret(secret: &[u8]) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        SIGNING_ALGORITHM
    }

    pub(crate) fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("secret", &"<redacted>")
            .finish()
    }
}
