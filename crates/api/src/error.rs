use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection, StringRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::services::ParseError;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// When set, 5xx bodies carry the underlying cause in `details`.
static EXPOSE_ERROR_DETAILS: AtomicBool = AtomicBool::new(false);

/// Enables or disables error causes in 5xx response bodies.
pub fn set_expose_error_details(enabled: bool) {
    EXPOSE_ERROR_DETAILS.store(enabled, Ordering::Relaxed);
}

fn expose_error_details() -> bool {
    EXPOSE_ERROR_DETAILS.load(Ordering::Relaxed)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    InvalidFields(String, Vec<ValidationDetail>),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg, None)
            }
            ApiError::InvalidFields(msg, fields) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg,
                serde_json::to_value(fields).ok(),
            ),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg, None)
            }
            ApiError::GatewayTimeout(msg) => {
                tracing::warn!("Request timed out: {}", msg);
                (StatusCode::GATEWAY_TIMEOUT, "gateway_timeout", msg, None)
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                let details = expose_error_details().then(|| Value::String(msg));
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                    details,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => ApiError::Conflict("Resource already exists".into()),
                Some("23503") => ApiError::NotFound("Referenced resource not found".into()),
                _ => ApiError::Internal(format!("Database error: {}", db_err)),
            },
            sqlx::Error::PoolTimedOut => {
                ApiError::ServiceUnavailable("Database is busy, try again shortly".into())
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details = Vec::new();
        collect_validation_details("", &errors, &mut details);

        let message = match details.as_slice() {
            [single] => format!("{}: {}", single.field, single.message),
            _ => format!("{} validation errors", details.len()),
        };

        ApiError::InvalidFields(message, details)
    }
}

/// Flattens nested validator errors into `path.to.field` entries.
fn collect_validation_details(
    prefix: &str,
    errors: &validator::ValidationErrors,
    out: &mut Vec<ValidationDetail>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                out.extend(field_errors.iter().map(|e| ValidationDetail {
                    field: path.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_validation_details(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    collect_validation_details(&format!("{}[{}]", path, idx), inner, out);
                }
            }
        }
    }
}

impl From<ParseError> for ApiError {
    fn from(err: ParseError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        rejection_to_error(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        rejection_to_error(rejection.status(), rejection.body_text())
    }
}

impl From<StringRejection> for ApiError {
    fn from(rejection: StringRejection) -> Self {
        rejection_to_error(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        rejection_to_error(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        rejection_to_error(err.status(), err.body_text())
    }
}

/// Re-shapes axum's plain-text extractor rejections into the JSON error body.
fn rejection_to_error(status: StatusCode, text: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(text)
    } else {
        ApiError::Validation(text)
    }
}
