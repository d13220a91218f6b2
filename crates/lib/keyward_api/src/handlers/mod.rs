//! Request handlers.

pub mod auth;
