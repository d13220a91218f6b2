//! # keyward_core
//!
//! Token lifecycle and credential logic for Keyward: signing key material,
//! claim construction, token issuance and validation, and the credential
//! service that ties them to a [`store::CredentialStore`].

pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;
