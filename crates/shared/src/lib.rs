//! Shared utilities for the wedding planner backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (hashing, constant-time comparison)
//! - Text normalization helpers

pub mod crypto;
pub mod validation;
