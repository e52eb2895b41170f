//! Repository implementations for database operations.

pub mod guest;
pub mod household;

pub use guest::{GuestRepository, GUEST_NAME_CONSTRAINT};
pub use household::{HouseholdRepository, HOUSEHOLD_CODE_CONSTRAINT, HOUSEHOLD_NAME_CONSTRAINT};
