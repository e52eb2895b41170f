//! Admin API key check.
//!
//! Admin routes are guarded by a single shared key from configuration,
//! presented in the `X-API-Key` header.

use crate::config::SecurityConfig;
use crate::error::ApiError;
use shared::crypto::key_matches;

/// Header carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "X-API-Key";

/// How an admin request was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAccess {
    /// The presented key matched the configured one.
    Authenticated,
    /// No admin key is configured, so admin routes are open.
    Open,
}

impl AdminAccess {
    /// Checks a presented key against the configured admin key.
    pub fn validate(security: &SecurityConfig, presented: Option<&str>) -> Result<Self, ApiError> {
        let Some(expected) = security.admin_api_key.as_deref() else {
            return Ok(AdminAccess::Open);
        };

        match presented.map(str::trim) {
            Some(key) if !key.is_empty() && key_matches(key, expected) => {
                Ok(AdminAccess::Authenticated)
            }
            _ => Err(ApiError::Unauthorized(
                "Invalid or missing API key".to_string(),
            )),
        }
    }
}
