//! Domain layer for the wedding planner backend.
//!
//! This crate contains:
//! - Domain models (Household, Guest, import records and results)
//! - The guest import services: record parsing, reconciliation and
//!   chunked-upload bookkeeping

pub mod models;
pub mod services;
