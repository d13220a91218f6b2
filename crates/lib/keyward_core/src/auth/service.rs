//! Registration, login and refresh over a credential store.

use std::sync::Arc;

use tracing::{debug, info};
use validator::{Validate, ValidationError, ValidationErrors};

use super::AuthError;
use super::claims::build_claim_set;
use super::issuer::TokenIssuer;
use super::keys::SigningKey;
use super::password;
use super::settings::{ConfigError, JwtSettings};
use super::validator::{ExpiryCheck, TokenValidator};
use crate::models::auth::{Identity, TokenPair};
use crate::store::CredentialStore;

/// Registration input rules, checked before the store is consulted.
#[derive(Debug, Validate)]
struct Registration {
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    email: String,

    #[validate(
        length(min = 6, message = "Minimum password length is 6 characters"),
        custom(function = "within_bcrypt_limit")
    )]
    password: String,
}

fn within_bcrypt_limit(value: &str) -> Result<(), ValidationError> {
    if value.len() > password::MAX_PASSWORD_BYTES {
        return Err(ValidationError::new("password_too_long")
            .with_message("Maximum password length is 72 bytes".into()));
    }
    Ok(())
}

/// Orchestrates the token lifecycle on top of a [`CredentialStore`].
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl CredentialService {
    /// Builds the signing key from `settings` and wires issuer and validator
    /// to it. Invalid settings are a configuration fault.
    pub fn new(store: Arc<dyn CredentialStore>, settings: &JwtSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        password::prepare_dummy_hash();
        let key = Arc::new(SigningKey::from_secret(settings.secret.as_bytes())?);
        Ok(Self {
            store,
            issuer: TokenIssuer::new(key.clone(), settings),
            validator: TokenValidator::new(key, settings),
        })
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Register a new identity. Registration does not log the user in.
    pub async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let input = Registration {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        if let Err(errors) = input.validate() {
            return Err(AuthError::Validation(validation_messages(&errors)));
        }

        let identity = self.store.create_identity(&input.email, password).await?;
        info!(user_id = %identity.id, "identity registered");
        Ok(identity)
    }

    /// Authenticate with email + password and issue a token pair.
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let Some(identity) = self.store.find_by_email(email).await? else {
            password::verify_against_dummy(password).await;
            debug!("login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.store.verify_password(&identity, password).await? {
            debug!(user_id = %identity.id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_for(&identity).await?;
        info!(user_id = %identity.id, "login succeeded");
        Ok(tokens)
    }

    /// Re-issue a token pair from an access token whose only fault may be
    /// that it has expired.
    ///
    /// The refresh token is not bound to any stored value; a validly signed
    /// access token for a still-existing identity is what authorizes the
    /// reissue.
    pub async fn refresh(
        &self,
        access_token: &str,
        _refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        let claims = self
            .validator
            .validate(access_token, ExpiryCheck::Ignore)
            .map_err(|reason| {
                debug!(%reason, "refresh rejected: access token failed validation");
                AuthError::InvalidToken
            })?;

        if claims.sub.is_empty() {
            debug!("refresh rejected: token has no subject");
            return Err(AuthError::InvalidToken);
        }

        let Some(identity) = self.store.find_by_id(&claims.sub).await? else {
            debug!(user_id = %claims.sub, "refresh rejected: identity no longer exists");
            return Err(AuthError::InvalidToken);
        };

        // Claims are rebuilt from the identity's current state, so role
        // changes since the original login take effect here.
        let tokens = self.issue_for(&identity).await?;
        info!(user_id = %identity.id, superseded_jti = %claims.jti, "token pair refreshed");
        Ok(tokens)
    }

    async fn issue_for(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        let roles = self.store.roles(identity).await?;
        self.issuer.issue(build_claim_set(identity, roles))
    }
}

/// Flatten field errors into messages, ordered by field name.
fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| (field.to_string(), errs))
        .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::auth::ClaimSet;
    use crate::store::InMemoryCredentialStore;

    fn settings() -> JwtSettings {
        JwtSettings::new("service-test-secret")
    }

    fn service() -> (Arc<InMemoryCredentialStore>, CredentialService) {
        let store = Arc::new(InMemoryCredentialStore::new());
        let service = CredentialService::new(store.clone(), &settings()).unwrap();
        (store, service)
    }

    fn payload(token: &str) -> serde_json::Value {
        let segment = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn empty_secret_refuses_to_build() {
        let store = Arc::new(InMemoryCredentialStore::new());
        assert!(matches!(
            CredentialService::new(store, &JwtSettings::new("")),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[tokio::test]
    async fn register_then_login_yields_token_for_identity() {
        let (_, service) = service();
        let identity = service.register("alice@example.com", "secret1").await.unwrap();

        let tokens = service.login("alice@example.com", "secret1").await.unwrap();
        assert_eq!(tokens.expires_in, 15 * 60);
        assert_eq!(STANDARD.decode(&tokens.refresh_token).unwrap().len(), 32);

        let claims = service
            .validator()
            .validate(&tokens.access_token, ExpiryCheck::Enforce)
            .unwrap();
        assert_eq!(claims.sub, identity.id);
        assert_eq!(claims.email, "alice@example.com");
        assert!(claims.roles.is_empty());
        assert_eq!(payload(&tokens.access_token)["email"], "alice@example.com");
    }

    #[tokio::test]
    async fn register_reports_every_input_problem() {
        let (store, service) = service();
        let err = service.register("not-an-email", "123").await.unwrap_err();

        match err {
            AuthError::Validation(errors) => assert_eq!(
                errors,
                vec![
                    "The Email field is not a valid e-mail address.",
                    "Minimum password length is 6 characters",
                ]
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn passwords_over_72_bytes_are_refused_at_registration() {
        let (store, service) = service();
        let prefix = "a".repeat(72);

        let err = service
            .register("long@example.com", &format!("{prefix}ONE"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Validation(ref e) if e == &["Maximum password length is 72 bytes"]
        ));
        assert!(store.is_empty());

        service.register("long@example.com", &prefix).await.unwrap();
        assert!(matches!(
            service
                .login("long@example.com", &format!("{prefix}TWO"))
                .await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(service.login("long@example.com", &prefix).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_validation_error() {
        let (_, service) = service();
        service.register("dup@example.com", "secret1").await.unwrap();

        let err = service.register("DUP@example.com", "secret2").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(ref e) if e[0].contains("already taken")));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_fail_identically() {
        let (_, service) = service();
        service.register("bob@example.com", "secret1").await.unwrap();

        let unknown = service.login("nobody@example.com", "secret1").await.unwrap_err();
        let wrong = service.login("bob@example.com", "wrong-pass").await.unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn login_embeds_roles_in_store_order() {
        let (store, service) = service();
        let identity = service.register("carol@example.com", "secret1").await.unwrap();
        store.grant_role(&identity.id, "editor");
        store.grant_role(&identity.id, "admin");

        let tokens = service.login("carol@example.com", "secret1").await.unwrap();
        let claims = service
            .validator()
            .validate(&tokens.access_token, ExpiryCheck::Enforce)
            .unwrap();
        assert_eq!(claims.roles, vec!["editor", "admin"]);
    }

    #[tokio::test]
    async fn refresh_accepts_expired_token_and_issues_new_jti() {
        let (store, service) = service();
        let identity = service.register("dave@example.com", "secret1").await.unwrap();
        let roles = store_roles(&store, &identity).await;

        let expired = service
            .issuer()
            .issue_at(build_claim_set(&identity, roles), Utc::now() - Duration::hours(1))
            .unwrap();
        let old = service
            .validator()
            .validate(&expired.access_token, ExpiryCheck::Ignore)
            .unwrap();
        assert!(
            service
                .validator()
                .validate(&expired.access_token, ExpiryCheck::Enforce)
                .is_err()
        );

        let fresh = service
            .refresh(&expired.access_token, &expired.refresh_token)
            .await
            .unwrap();
        let new = service
            .validator()
            .validate(&fresh.access_token, ExpiryCheck::Enforce)
            .unwrap();

        assert_eq!(new.sub, old.sub);
        assert_ne!(new.jti, old.jti);
        assert_ne!(fresh.refresh_token, expired.refresh_token);
    }

    #[tokio::test]
    async fn refresh_picks_up_role_changes() {
        let (store, service) = service();
        let identity = service.register("erin@example.com", "secret1").await.unwrap();
        let tokens = service.login("erin@example.com", "secret1").await.unwrap();

        store.grant_role(&identity.id, "admin");
        let refreshed = service
            .refresh(&tokens.access_token, &tokens.refresh_token)
            .await
            .unwrap();

        let claims = service
            .validator()
            .validate(&refreshed.access_token, ExpiryCheck::Enforce)
            .unwrap();
        assert_eq!(claims.roles, vec!["admin"]);
    }

    #[tokio::test]
    async fn refresh_rejects_tampered_and_foreign_tokens() {
        let (_, service) = service();
        service.register("frank@example.com", "secret1").await.unwrap();
        let tokens = service.login("frank@example.com", "secret1").await.unwrap();

        let mut tampered = tokens.access_token.clone();
        tampered.push('x');
        assert!(matches!(
            service.refresh(&tampered, &tokens.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));

        let mut other = settings();
        other.audience = "somebody-else".into();
        let foreign =
            CredentialService::new(Arc::new(InMemoryCredentialStore::new()), &other).unwrap();
        let foreign_token = foreign
            .issuer()
            .issue(ClaimSet {
                sub: "whoever".into(),
                email: "frank@example.com".into(),
                jti: "j".into(),
                roles: Vec::new(),
            })
            .unwrap();
        assert!(matches!(
            service
                .refresh(&foreign_token.access_token, &foreign_token.refresh_token)
                .await,
            Err(AuthError::InvalidToken)
        ));

        assert!(matches!(
            service.refresh("garbage", "garbage").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn refresh_rejects_unknown_or_empty_subject() {
        let (_, service) = service();

        for sub in ["no-such-identity", ""] {
            let tokens = service
                .issuer()
                .issue(ClaimSet {
                    sub: sub.into(),
                    email: "ghost@example.com".into(),
                    jti: "j".into(),
                    roles: Vec::new(),
                })
                .unwrap();
            assert!(matches!(
                service
                    .refresh(&tokens.access_token, &tokens.refresh_token)
                    .await,
                Err(AuthError::InvalidToken)
            ));
        }
    }

    async fn store_roles(store: &InMemoryCredentialStore, identity: &Identity) -> Vec<String> {
        store.roles(identity).await.unwrap()
    }
}
