//! Authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::extractors::{AdminAccess, ADMIN_KEY_HEADER};

/// Middleware for admin-only routes.
///
/// Validates `X-API-Key` against `security.admin_api_key` and stores the
/// resulting [`AdminAccess`] in the request extensions, where the import
/// handlers pick it up for their log lines.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match AdminAccess::validate(&state.config.security, presented) {
        Ok(access) => {
            req.extensions_mut().insert(access);
            next.run(req).await
        }
        Err(err) => {
            tracing::warn!(path = %req.uri().path(), "Rejected admin request");
            err.into_response()
        }
    }
}
