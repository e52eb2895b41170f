//! Persistence layer for the wedding planner backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - The Postgres-backed guest import store

pub mod db;
pub mod entities;
pub mod import_store;
pub mod metrics;
pub mod repositories;

pub use import_store::PgGuestStore;
