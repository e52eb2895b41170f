//! HTTP route handlers.

pub mod guest_import;
pub mod health;
pub mod households;
