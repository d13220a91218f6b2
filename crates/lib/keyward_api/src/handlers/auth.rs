//! Authentication request handlers.

use axum::extract::State;
use axum::{Extension, Json};
use tracing::info;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    CurrentUserResponse, LoginRequest, LoginResponse, MessageResponse, RefreshRequest,
    RegisterRequest, TokenResponse,
};

/// `POST /api/auth/register`: create a new identity. Does not log in.
pub async fn register_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.auth.register(&body.email, &body.password).await?;
    Ok(Json(MessageResponse {
        message: "User registered successfully!".into(),
    }))
}

/// `POST /api/auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let tokens = state.auth.login(&body.email, &body.password).await?;
    Ok(Json(LoginResponse::new("Logged in successfully!", tokens)))
}

/// `POST /api/auth/refresh-token`: reissue a token pair from a possibly
/// expired access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let tokens = state
        .auth
        .refresh(&body.access_token, &body.refresh_token)
        .await?;
    Ok(Json(tokens.into()))
}

/// `GET /api/auth/me`: the caller's claims. Requires authentication.
pub async fn me_handler(
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> Json<CurrentUserResponse> {
    info!(user_id = %claims.sub, "current user requested");
    Json(claims.into())
}
