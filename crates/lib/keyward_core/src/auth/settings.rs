//! Token settings resolved from the environment.

use std::fmt;

use chrono::Duration;
use thiserror::Error;

/// Default issuer when `JWT_ISSUER` is unset.
pub const DEFAULT_ISSUER: &str = "keyward";

/// Default audience when `JWT_AUDIENCE` is unset.
pub const DEFAULT_AUDIENCE: &str = "keyward-clients";

/// Default access token lifetime in minutes.
pub const DEFAULT_ACCESS_TOKEN_EXPIRATION_MINUTES: i64 = 15;

/// Default refresh token lifetime in days.
pub const DEFAULT_REFRESH_TOKEN_EXPIRATION_DAYS: i64 = 7;

/// Longest accepted access token lifetime: one year.
pub const MAX_ACCESS_TOKEN_EXPIRATION_MINUTES: i64 = 60 * 24 * 365;

/// Longest accepted refresh token lifetime: ten years.
pub const MAX_REFRESH_TOKEN_EXPIRATION_DAYS: i64 = 365 * 10;

/// Configuration faults. Any of these must stop the process from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET is not configured; refusing to run without a signing secret")]
    MissingSecret,

    #[error("{var} must not be empty")]
    Empty { var: &'static str },

    #[error("{var} has invalid value '{value}': expected a positive integer")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} is {value}, above the maximum of {max}")]
    OutOfRange {
        var: &'static str,
        value: i64,
        max: i64,
    },
}

/// Signing and lifetime settings for issued tokens.
#[derive(Clone)]
pub struct JwtSettings {
    /// Symmetric HMAC signing secret.
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_expiration_minutes: i64,
    /// Carried for clients and operators; refresh tokens are not persisted,
    /// so nothing enforces this lifetime yet.
    pub refresh_token_expiration_days: i64,
}

impl JwtSettings {
    /// Settings with default issuer, audience and lifetimes.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: DEFAULT_ISSUER.into(),
            audience: DEFAULT_AUDIENCE.into(),
            access_token_expiration_minutes: DEFAULT_ACCESS_TOKEN_EXPIRATION_MINUTES,
            refresh_token_expiration_days: DEFAULT_REFRESH_TOKEN_EXPIRATION_DAYS,
        }
    }

    /// Reads settings from environment variables.
    ///
    /// | Variable                        | Default           |
    /// |---------------------------------|-------------------|
    /// | `JWT_SECRET`                    | required          |
    /// | `JWT_ISSUER`                    | `keyward`         |
    /// | `JWT_AUDIENCE`                  | `keyward-clients` |
    /// | `JWT_ACCESS_TOKEN_EXPIRATION`   | `15` (minutes)    |
    /// | `JWT_REFRESH_TOKEN_EXPIRATION`  | `7` (days)        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolves settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET").ok_or(ConfigError::MissingSecret)?;
        let settings = Self {
            secret,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_AUDIENCE.into()),
            access_token_expiration_minutes: positive(
                &lookup,
                "JWT_ACCESS_TOKEN_EXPIRATION",
                DEFAULT_ACCESS_TOKEN_EXPIRATION_MINUTES,
            )?,
            refresh_token_expiration_days: positive(
                &lookup,
                "JWT_REFRESH_TOKEN_EXPIRATION",
                DEFAULT_REFRESH_TOKEN_EXPIRATION_DAYS,
            )?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Checks invariants that hold regardless of where the settings came from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Empty { var: "JWT_ISSUER" });
        }
        if self.audience.trim().is_empty() {
            return Err(ConfigError::Empty { var: "JWT_AUDIENCE" });
        }
        if self.access_token_expiration_minutes <= 0 {
            return Err(ConfigError::InvalidNumber {
                var: "JWT_ACCESS_TOKEN_EXPIRATION",
                value: self.access_token_expiration_minutes.to_string(),
            });
        }
        if self.refresh_token_expiration_days <= 0 {
            return Err(ConfigError::InvalidNumber {
                var: "JWT_REFRESH_TOKEN_EXPIRATION",
                value: self.refresh_token_expiration_days.to_string(),
            });
        }
        if self.access_token_expiration_minutes > MAX_ACCESS_TOKEN_EXPIRATION_MINUTES {
            return Err(ConfigError::OutOfRange {
                var: "JWT_ACCESS_TOKEN_EXPIRATION",
                value: self.access_token_expiration_minutes,
                max: MAX_ACCESS_TOKEN_EXPIRATION_MINUTES,
            });
        }
        if self.refresh_token_expiration_days > MAX_REFRESH_TOKEN_EXPIRATION_DAYS {
            return Err(ConfigError::OutOfRange {
                var: "JWT_REFRESH_TOKEN_EXPIRATION",
                value: self.refresh_token_expiration_days,
                max: MAX_REFRESH_TOKEN_EXPIRATION_DAYS,
            });
        }
        Ok(())
    }

    pub fn access_token_lifetime(&self) -> Duration {
        Duration::minutes(self.access_token_expiration_minutes)
    }

    pub fn refresh_token_lifetime(&self) -> Duration {
        Duration::days(self.refresh_token_expiration_days)
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field(
                "access_token_expiration_minutes",
                &self.access_token_expiration_minutes,
            )
            .field(
                "refresh_token_expiration_days",
                &self.refresh_token_expiration_days,
            )
            .finish()
    }
}

fn positive<F>(lookup: &F, var: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidNumber { var, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let settings = JwtSettings::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(settings.secret, "s3cret");
        assert_eq!(settings.issuer, DEFAULT_ISSUER);
        assert_eq!(settings.audience, DEFAULT_AUDIENCE);
        assert_eq!(settings.access_token_expiration_minutes, 15);
        assert_eq!(settings.refresh_token_expiration_days, 7);
        assert_eq!(settings.access_token_lifetime(), Duration::minutes(15));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let settings = JwtSettings::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_ISSUER", "issuer-x"),
            ("JWT_AUDIENCE", "aud-y"),
            ("JWT_ACCESS_TOKEN_EXPIRATION", "60"),
            ("JWT_REFRESH_TOKEN_EXPIRATION", "30"),
        ]))
        .unwrap();
        assert_eq!(settings.issuer, "issuer-x");
        assert_eq!(settings.audience, "aud-y");
        assert_eq!(settings.access_token_expiration_minutes, 60);
        assert_eq!(settings.refresh_token_lifetime(), Duration::days(30));
    }

    #[test]
    fn missing_or_empty_secret_is_fatal() {
        assert!(matches!(
            JwtSettings::from_lookup(lookup(&[])),
            Err(ConfigError::MissingSecret)
        ));
        assert!(matches!(
            JwtSettings::from_lookup(lookup(&[("JWT_SECRET", "")])),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn non_positive_lifetimes_are_rejected() {
        let err = JwtSettings::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_ACCESS_TOKEN_EXPIRATION", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber { var: "JWT_ACCESS_TOKEN_EXPIRATION", .. }
        ));

        let err = JwtSettings::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_REFRESH_TOKEN_EXPIRATION", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber { var: "JWT_REFRESH_TOKEN_EXPIRATION", .. }
        ));
    }

    #[test]
    fn oversized_lifetimes_are_rejected_at_load() {
        let err = JwtSettings::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_ACCESS_TOKEN_EXPIRATION", "200000000000"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                var: "JWT_ACCESS_TOKEN_EXPIRATION",
                value: 200_000_000_000,
                ..
            }
        ));

        let err = JwtSettings::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_REFRESH_TOKEN_EXPIRATION", "9223372036854775807"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange { var: "JWT_REFRESH_TOKEN_EXPIRATION", .. }
        ));
    }

    #[test]
    fn maximum_lifetime_is_accepted() {
        let max = MAX_ACCESS_TOKEN_EXPIRATION_MINUTES.to_string();
        let settings = JwtSettings::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_ACCESS_TOKEN_EXPIRATION", max.as_str()),
        ]))
        .unwrap();
        assert_eq!(settings.access_token_lifetime(), Duration::days(365));
    }

    #[test]
    fn blank_issuer_is_rejected() {
        let err = JwtSettings::from_lookup(lookup(&[("JWT_SECRET", "s3cret"), ("JWT_ISSUER", " ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Empty { var: "JWT_ISSUER" }));
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let rendered = format!("{:?}", JwtSettings::new("top-secret-value"));
        assert!(!rendered.contains("top-secret-value"));
        assert!(rendered.contains("<redacted>"));
    }
}
