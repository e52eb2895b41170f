//! Guest import models.
//!
//! Covers the three import request shapes (header-keyed rows, pre-typed
//! guest records, raw delimited text), the per-guest processing results and
//! the aggregate response bodies.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use shared::validation::trim_to_option;
use validator::Validate;

use super::guest::NewGuest;

/// Number of data rows submitted per upload-batch request.
pub const IMPORT_BATCH_SIZE: usize = 10;

/// Overall client-side timeout for one import operation.
pub const CLIENT_IMPORT_TIMEOUT_SECS: u64 = 60;

/// Maximum records accepted in a single import request.
pub const MAX_RECORDS_PER_REQUEST: usize = 500;

/// Result error for a guest whose name already exists in the household.
pub const DUPLICATE_GUEST: &str = "Duplicate guest";

/// Result error for guests left unprocessed after a household-level failure.
pub const HOUSEHOLD_PROCESSING_FAILED: &str = "Household processing failed";

/// Columns the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestField {
    Name,
    Household,
    Email,
    Child,
    Teenager,
    DietaryNotes,
}

impl GuestField {
    /// Fields that must be present in the header row.
    pub const REQUIRED: [GuestField; 2] = [GuestField::Name, GuestField::Household];

    /// Canonical header name.
    pub fn header(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Household => "Household",
            Self::Email => "Email",
            Self::Child => "Child",
            Self::Teenager => "Teenager",
            Self::DietaryNotes => "DietaryNotes",
        }
    }

    /// Accepted header spellings, already folded by [`header_key`], most
    /// specific first.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Name => &["name", "guestname", "fullname"],
            Self::Household => &["household", "householdname", "family"],
            Self::Email => &["email", "emailaddress"],
            Self::Child => &["child", "ischild"],
            Self::Teenager => &["teenager", "teen", "isteenager"],
            Self::DietaryNotes => &["dietarynotes", "dietary", "dietaryrestrictions", "notes"],
        }
    }

    /// Returns true when `header` names this field.
    pub fn matches_header(&self, header: &str) -> bool {
        let key = header_key(header);
        self.aliases().iter().any(|alias| *alias == key)
    }
}

/// Folds a header for comparison: case, spaces, `_` and `-` are ignored.
pub fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Returns true for the affirmative tokens used by the Child/Teenager columns.
///
/// Accepts `yes`, `y`, `true`, `1`, `x` and the single-letter codes `c`
/// (child) and `t` (teenager), case-insensitively and ignoring surrounding
/// whitespace. Everything else, including the empty string, is false.
pub fn is_affirmative_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "y" | "true" | "1" | "x" | "c" | "t"
    )
}

/// One parsed input row keyed by header.
///
/// Values that arrive as JSON booleans or numbers are stringified so the
/// same flag predicate applies regardless of how the client encoded them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, String>"
)]
pub struct RawGuestRecord {
    /// Header/value pairs in column order.
    fields: Vec<(String, String)>,
}

impl RawGuestRecord {
    /// Builds a record from header/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value for a column, matched by header alias.
    ///
    /// When several columns match, aliases are tried in preference order
    /// (the canonical header first) and the leftmost column wins a tie.
    pub fn get(&self, field: GuestField) -> Option<&str> {
        field
            .aliases()
            .iter()
            .find_map(|alias| {
                self.fields
                    .iter()
                    .find(|(header, _)| header_key(header) == *alias)
            })
            .map(|(_, value)| value.as_str())
    }

    /// Number of columns in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for RawGuestRecord {
    fn from(map: BTreeMap<String, Value>) -> Self {
        let fields = map
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k, value)
            })
            .collect();
        Self { fields }
    }
}

impl From<RawGuestRecord> for BTreeMap<String, String> {
    fn from(record: RawGuestRecord) -> Self {
        record.fields.into_iter().collect()
    }
}

/// Pre-typed guest record as sent by the pasted-text importer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuestRecord {
    /// Missing or null deserializes to empty; such rows are dropped later.
    #[serde(default, deserialize_with = "deserialize_text")]
    #[validate(length(max = 200, message = "name must be at most 200 characters"))]
    pub name: String,

    #[serde(default, deserialize_with = "deserialize_text")]
    #[validate(length(max = 200, message = "household must be at most 200 characters"))]
    pub household: String,

    #[serde(default)]
    #[validate(length(max = 320, message = "email must be at most 320 characters"))]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_child: bool,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_teenager: bool,

    #[serde(default)]
    #[validate(length(max = 1000, message = "dietaryNotes must be at most 1000 characters"))]
    pub dietary_notes: Option<String>,
}

impl GuestRecord {
    /// Derives a typed record from a header-keyed row.
    ///
    /// Returns `None` when the row has no usable name or household.
    pub fn from_raw(raw: &RawGuestRecord) -> Option<Self> {
        let flag = |field| raw.get(field).map(is_affirmative_flag).unwrap_or(false);
        Self {
            name: raw.get(GuestField::Name).unwrap_or_default().to_string(),
            household: raw.get(GuestField::Household).unwrap_or_default().to_string(),
            email: raw.get(GuestField::Email).map(str::to_string),
            is_child: flag(GuestField::Child),
            is_teenager: flag(GuestField::Teenager),
            dietary_notes: raw.get(GuestField::DietaryNotes).map(str::to_string),
        }
        .normalized()
    }

    /// Trims every text field; `None` if name or household ends up empty.
    pub fn normalized(self) -> Option<Self> {
        let name = trim_to_option(&self.name)?;
        let household = trim_to_option(&self.household)?;
        Some(Self {
            name,
            household,
            email: self.email.as_deref().and_then(trim_to_option),
            is_child: self.is_child,
            is_teenager: self.is_teenager,
            dietary_notes: self.dietary_notes.as_deref().and_then(trim_to_option),
        })
    }

    /// Insert payload for this record.
    pub fn to_new_guest(&self) -> NewGuest {
        NewGuest {
            name: self.name.clone(),
            email: self.email.clone(),
            is_child: self.is_child,
            is_teenager: self.is_teenager,
            dietary_notes: self.dietary_notes.clone(),
        }
    }
}

/// Accepts a string, null or any other scalar rendered as text.
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Accepts a boolean, an affirmative-token string, a number or null.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::String(s) => is_affirmative_flag(&s),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    })
}

/// Outcome for a single guest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub name: String,
    pub household_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingResult {
    pub fn created(name: &str, household_name: &str) -> Self {
        Self {
            name: name.to_string(),
            household_name: household_name.to_string(),
            success: true,
            error: None,
        }
    }

    pub fn failed(name: &str, household_name: &str, error: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            household_name: household_name.to_string(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Counts of rows written by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedCounts {
    /// Households newly created.
    pub households: u32,
    /// Guests newly inserted.
    pub guests: u32,
}

/// Counts of rows that were not written and are not errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCounts {
    pub duplicates: u32,
    /// Rows dropped for a missing name or household.
    #[serde(default)]
    pub invalid_rows: u32,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub processed: ProcessedCounts,
    pub skipped: SkippedCounts,
    pub results: Vec<ProcessingResult>,
    /// Household-level failure descriptions.
    pub errors: Vec<String>,
}

impl ImportOutcome {
    /// Rows that failed for a reason other than being a duplicate.
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| !r.success && r.error.as_deref() != Some(DUPLICATE_GUEST))
            .count()
    }

    /// True when any household or guest failed to persist.
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty() || self.failed_count() > 0
    }
}

/// Body shared by `upload-batch` (inside the multipart `data` field) and
/// `import-text`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RawRecordsRequest {
    #[validate(length(min = 1, max = 500, message = "records must contain 1-500 items"))]
    pub records: Vec<RawGuestRecord>,
}

/// Body of `import-text-guests`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TypedGuestsRequest {
    #[validate(
        length(min = 1, max = 500, message = "guests must contain 1-500 items"),
        nested
    )]
    pub guests: Vec<GuestRecord>,
}

/// Response of `upload-batch`, `import-text` and `import-csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchImportResponse {
    pub success: bool,
    pub processed: ProcessedCounts,
    pub skipped: SkippedCounts,
    pub results: Vec<ProcessingResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub processing_time: String,
}

impl BatchImportResponse {
    pub fn from_outcome(outcome: ImportOutcome, elapsed: Duration) -> Self {
        Self {
            success: true,
            processed: outcome.processed,
            skipped: outcome.skipped,
            results: outcome.results,
            errors: (!outcome.errors.is_empty()).then_some(outcome.errors),
            processing_time: format_processing_time(elapsed),
        }
    }
}

/// Response of `import-text-guests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextGuestsImportResponse {
    pub success: bool,
    pub message: String,
    pub processed: ProcessedCounts,
    pub skipped: SkippedCounts,
    pub processing_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl TextGuestsImportResponse {
    /// Builds the response; partial success carries a warning and the
    /// collected failure messages.
    pub fn from_outcome(outcome: &ImportOutcome, elapsed: Duration) -> Self {
        let message = format!(
            "Imported {} guests into {} new households",
            outcome.processed.guests, outcome.processed.households
        );

        let (warning, errors) = if outcome.has_failures() {
            let mut errors = outcome.errors.clone();
            errors.extend(
                outcome
                    .results
                    .iter()
                    .filter(|r| !r.success && r.error.as_deref() != Some(DUPLICATE_GUEST))
                    .map(|r| {
                        format!(
                            "{} ({}): {}",
                            r.name,
                            r.household_name,
                            r.error.as_deref().unwrap_or("unknown error")
                        )
                    }),
            );
            (
                Some(format!("{} guests could not be imported", outcome.failed_count())),
                Some(errors),
            )
        } else {
            (None, None)
        };

        Self {
            success: !outcome.has_failures() || outcome.processed.guests > 0,
            message,
            processed: outcome.processed,
            skipped: outcome.skipped,
            processing_time: format_processing_time(elapsed),
            warning,
            errors,
        }
    }
}

/// Renders a processing duration as `"<millis>ms"`.
pub fn format_processing_time(elapsed: Duration) -> String {
    format!("{}ms", elapsed.as_millis())
}
