//! Guest domain models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// An individual invitee belonging to exactly one household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: Uuid,
    pub household_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    /// `None` until the household submits its RSVP.
    pub is_attending: Option<bool>,
    pub is_child: bool,
    pub is_teenager: bool,
    pub meal_option_id: Option<Uuid>,
    pub dessert_option_id: Option<Uuid>,
    pub dietary_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a guest during import.
///
/// Name and email are expected to be trimmed already.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGuest {
    pub name: String,
    pub email: Option<String>,
    pub is_child: bool,
    pub is_teenager: bool,
    pub dietary_notes: Option<String>,
}
