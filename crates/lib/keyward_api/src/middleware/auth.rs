//! Bearer token middleware.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use keyward_core::auth::validator::ExpiryCheck;
use keyward_core::models::auth::ClaimSet;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

const UNAUTHORIZED: &str = "Invalid or expired token";

/// Claims of the caller, placed in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub ClaimSet);

/// Extracts `Authorization: Bearer <token>`, validates it with expiry
/// enforced, and injects [`AuthenticatedUser`] into request extensions.
///
/// Every rejection carries the same message; the reason is only logged.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            debug!("missing authorization header");
            AppError::Unauthorized(UNAUTHORIZED.into())
        })?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        debug!("unsupported authorization scheme");
        AppError::Unauthorized(UNAUTHORIZED.into())
    })?;

    let claims = state
        .auth
        .validator()
        .validate(token, ExpiryCheck::Enforce)
        .map_err(|reason| {
            debug!(%reason, "bearer token rejected");
            AppError::Unauthorized(UNAUTHORIZED.into())
        })?;

    request.extensions_mut().insert(AuthenticatedUser(claims));
    Ok(next.run(request).await)
}
