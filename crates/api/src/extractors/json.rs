//! JSON body extractor with JSON error responses.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json` whose rejections render as [`ApiError`] bodies instead of
/// plain text.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);
