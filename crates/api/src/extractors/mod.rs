//! Custom Axum extractors.

pub mod admin_key;
pub mod json;

pub use admin_key::{AdminAccess, ADMIN_KEY_HEADER};
pub use json::AppJson;
