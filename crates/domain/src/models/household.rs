//! Household domain models.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

/// Length of a household access code.
pub const HOUSEHOLD_CODE_LENGTH: usize = 6;

/// Alphabet used for household access codes (uppercase base-36).
const HOUSEHOLD_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A named group of guests sharing one access code and one RSVP submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Household {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal guest projection used when reconciling imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseholdGuestName {
    pub id: Uuid,
    pub name: String,
}

/// A household together with the names of the guests it already owns.
#[derive(Debug, Clone)]
pub struct HouseholdWithGuests {
    pub household: Household,
    pub guests: Vec<HouseholdGuestName>,
}

/// Household listing entry for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub guest_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Generate a random 6-character uppercase base-36 household code.
pub fn generate_household_code() -> String {
    let mut rng = rand::thread_rng();
    (0..HOUSEHOLD_CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..HOUSEHOLD_CODE_ALPHABET.len());
            HOUSEHOLD_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Normalizes a user-supplied code for lookup.
pub fn normalize_household_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// True for a normalized code of the right length and alphabet.
pub fn is_valid_household_code(code: &str) -> bool {
    code.len() == HOUSEHOLD_CODE_LENGTH
        && code.bytes().all(|b| HOUSEHOLD_CODE_ALPHABET.contains(&b))
}
