//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod guest;
pub mod household;

pub use guest::{GuestEntity, GuestNameEntity};
pub use household::{HouseholdEntity, HouseholdSummaryEntity};
