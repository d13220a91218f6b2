//! Request extractors.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` whose rejections (bad syntax, missing fields, wrong content type)
/// become [`AppError::Validation`] instead of axum's plain-text responses.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
