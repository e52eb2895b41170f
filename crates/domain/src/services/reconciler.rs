//! Household/guest import reconciliation.
//!
//! Maps a batch of guest records onto create/skip decisions against the
//! households and guests already stored. Every import endpoint funnels into
//! [`reconcile`]; they differ only in how they turn their request body into
//! [`GuestRecord`]s.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use shared::validation::fold_key;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::guest::{Guest, NewGuest};
use crate::models::guest_import::{
    GuestRecord, ImportOutcome, ProcessingResult, RawGuestRecord, DUPLICATE_GUEST,
    HOUSEHOLD_PROCESSING_FAILED,
};
use crate::models::household::{generate_household_code, Household, HouseholdWithGuests};

/// Attempts at drawing an unused household code before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Errors surfaced by a [`GuestStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a household with this name already exists")]
    HouseholdNameTaken,

    #[error("household code is already in use")]
    HouseholdCodeTaken,

    #[error("a guest with this name already exists in the household")]
    GuestNameTaken,

    #[error("could not allocate a unique household code after {0} attempts")]
    CodeAllocationFailed(usize),

    #[error("household disappeared after a concurrent create")]
    HouseholdVanished,

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Text safe to return to the importing client.
    ///
    /// Database errors carry driver messages, which are only passed through
    /// when `expose_details` is set.
    pub fn client_message(&self, expose_details: bool) -> String {
        match self {
            Self::Database(_) if !expose_details => "database error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Storage operations the reconciler depends on.
#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Case-insensitive lookup including the household's current guest names.
    async fn find_household_by_name(
        &self,
        name: &str,
    ) -> Result<Option<HouseholdWithGuests>, StoreError>;

    /// Inserts a household.
    ///
    /// Must fail with [`StoreError::HouseholdNameTaken`] when another household
    /// has the same case-insensitive name and [`StoreError::HouseholdCodeTaken`]
    /// when the code is in use.
    async fn create_household(&self, name: &str, code: &str) -> Result<Household, StoreError>;

    /// Inserts a guest, failing with [`StoreError::GuestNameTaken`] on a
    /// case-insensitive name clash within the household.
    async fn insert_guest(&self, household_id: Uuid, guest: &NewGuest)
        -> Result<Guest, StoreError>;
}

/// Records sharing one household, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseholdGroup {
    /// Household name as first seen in the input.
    pub display_name: String,
    pub records: Vec<GuestRecord>,
}

/// Converts header-keyed rows, returning the usable records and the number
/// of rows dropped for a missing name or household.
pub fn prepare_raw_records(rows: &[RawGuestRecord]) -> (Vec<GuestRecord>, u32) {
    let records: Vec<GuestRecord> = rows.iter().filter_map(GuestRecord::from_raw).collect();
    let dropped = (rows.len() - records.len()) as u32;
    (records, dropped)
}

/// Normalizes pre-typed records, returning the usable ones and the number
/// dropped for a missing name or household.
pub fn prepare_typed_records(guests: Vec<GuestRecord>) -> (Vec<GuestRecord>, u32) {
    let total = guests.len();
    let records: Vec<GuestRecord> = guests.into_iter().filter_map(GuestRecord::normalized).collect();
    let dropped = (total - records.len()) as u32;
    (records, dropped)
}

/// Groups records by case-insensitive household name, preserving first-seen
/// group order and row order within each group.
pub fn group_by_household(records: Vec<GuestRecord>) -> Vec<HouseholdGroup> {
    let mut groups: Vec<HouseholdGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = fold_key(&record.household);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(HouseholdGroup {
                display_name: record.household.clone(),
                records: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].records.push(record);
    }

    groups
}

/// Finds the household by name or creates it with a fresh code.
///
/// Returns the household, its existing guests and whether it was created by
/// this call. A name conflict means a concurrent import created it first, in
/// which case the winner is read back.
pub async fn resolve_household<S>(
    store: &S,
    name: &str,
) -> Result<(HouseholdWithGuests, bool), StoreError>
where
    S: GuestStore + ?Sized,
{
    if let Some(existing) = store.find_household_by_name(name).await? {
        return Ok((existing, false));
    }

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = generate_household_code();
        match store.create_household(name, &code).await {
            Ok(household) => {
                debug!(household_id = %household.id, code = %household.code, "Household created");
                return Ok((
                    HouseholdWithGuests {
                        household,
                        guests: Vec::new(),
                    },
                    true,
                ));
            }
            Err(StoreError::HouseholdCodeTaken) => {
                warn!(attempt, "Household code collision, regenerating");
            }
            Err(StoreError::HouseholdNameTaken) => {
                info!(household = %name, "Household created concurrently, reusing it");
                return store
                    .find_household_by_name(name)
                    .await?
                    .map(|existing| (existing, false))
                    .ok_or(StoreError::HouseholdVanished);
            }
            Err(e) => return Err(e),
        }
    }

    Err(StoreError::CodeAllocationFailed(MAX_CODE_ATTEMPTS))
}

/// Reconciles a batch of records against the store.
///
/// Households are processed in first-seen order, guests in row order. A
/// failure inside one household marks its remaining guests as failed and
/// moves on to the next household. Database error text is withheld from the
/// outcome; use [`reconcile_with_details`] to include it.
pub async fn reconcile<S>(store: &S, records: Vec<GuestRecord>, invalid_rows: u32) -> ImportOutcome
where
    S: GuestStore + ?Sized,
{
    reconcile_with_details(store, records, invalid_rows, false).await
}

/// [`reconcile`], optionally keeping database error text in the outcome.
pub async fn reconcile_with_details<S>(
    store: &S,
    records: Vec<GuestRecord>,
    invalid_rows: u32,
    expose_details: bool,
) -> ImportOutcome
where
    S: GuestStore + ?Sized,
{
    let mut outcome = ImportOutcome::default();
    outcome.skipped.invalid_rows = invalid_rows;

    for group in group_by_household(records) {
        let household_name = group.display_name.as_str();

        let (resolved, created) = match resolve_household(store, household_name).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(household = %household_name, error = %e, "Failed to resolve household");
                outcome.errors.push(format!(
                    "Failed to process household {}: {}",
                    household_name,
                    e.client_message(expose_details)
                ));
                outcome.results.extend(group.records.iter().map(|r| {
                    ProcessingResult::failed(&r.name, household_name, HOUSEHOLD_PROCESSING_FAILED)
                }));
                continue;
            }
        };

        if created {
            outcome.processed.households += 1;
        }

        let household_id = resolved.household.id;
        let mut known: HashSet<String> =
            resolved.guests.iter().map(|g| fold_key(&g.name)).collect();

        let mut pending = group.records.iter();
        while let Some(record) = pending.next() {
            let key = fold_key(&record.name);
            if known.contains(&key) {
                outcome.skipped.duplicates += 1;
                outcome
                    .results
                    .push(ProcessingResult::failed(&record.name, household_name, DUPLICATE_GUEST));
                continue;
            }

            match store.insert_guest(household_id, &record.to_new_guest()).await {
                Ok(_) => {
                    known.insert(key);
                    outcome.processed.guests += 1;
                    outcome
                        .results
                        .push(ProcessingResult::created(&record.name, household_name));
                }
                Err(StoreError::GuestNameTaken) => {
                    known.insert(key);
                    outcome.skipped.duplicates += 1;
                    outcome
                        .results
                        .push(ProcessingResult::failed(&record.name, household_name, DUPLICATE_GUEST));
                }
                Err(e) => {
                    error!(
                        household = %household_name,
                        guest = %record.name,
                        error = %e,
                        "Guest insert failed, abandoning household"
                    );
                    let message = e.client_message(expose_details);
                    outcome.errors.push(format!(
                        "Failed to process household {}: {}",
                        household_name, message
                    ));
                    outcome
                        .results
                        .push(ProcessingResult::failed(&record.name, household_name, message));
                    for failed in pending.by_ref() {
                        outcome.results.push(ProcessingResult::failed(
                            &failed.name,
                            household_name,
                            HOUSEHOLD_PROCESSING_FAILED,
                        ));
                    }
                    break;
                }
            }
        }
    }

    info!(
        households_created = outcome.processed.households,
        guests_created = outcome.processed.guests,
        duplicates = outcome.skipped.duplicates,
        invalid_rows = outcome.skipped.invalid_rows,
        household_errors = outcome.errors.len(),
        "Guest import reconciled"
    );

    outcome
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use crate::models::household::HOUSEHOLD_CODE_LENGTH;
    use crate::services::record_parser::parse_records;
    use fake::faker::name::en::Name;
    use fake::Fake;
    use std::sync::atomic::Ordering;

    const SCENARIO_CSV: &str = "Name,Email,Household,Child,Teenager\n\
        John Smith,john@example.com,Smith Family,,\n\
        Jane Smith,jane@example.com,Smith Family,,\n\
        Billy Smith,,Smith Family,yes,\n";

    fn record(name: &str, household: &str) -> GuestRecord {
        GuestRecord {
            name: name.to_string(),
            household: household.to_string(),
            email: None,
            is_child: false,
            is_teenager: false,
            dietary_notes: None,
        }
    }

    async fn import_csv(store: &MemoryStore, text: &str) -> ImportOutcome {
        let parsed = parse_records(text).unwrap();
        let (records, dropped) = prepare_raw_records(&parsed.records);
        reconcile(store, records, dropped).await
    }

    #[test]
    fn test_group_by_household_is_case_insensitive() {
        let groups = group_by_household(vec![
            record("Ann", "Smith Family"),
            record("Bo", "Lee House"),
            record("Cy", "smith family"),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].display_name, "Smith Family");
        assert_eq!(
            groups[0].records.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["Ann", "Cy"]
        );
        assert_eq!(groups[1].display_name, "Lee House");
    }

    #[test]
    fn test_prepare_typed_records_drops_blank_rows() {
        let (records, dropped) = prepare_typed_records(vec![
            record("  Ann ", " H1 "),
            record("   ", "H1"),
            record("Bo", ""),
        ]);
        assert_eq!(dropped, 2);
        assert_eq!(records, vec![record("Ann", "H1")]);
    }

    #[tokio::test]
    async fn test_scenario_import_creates_household_and_guests() {
        let store = MemoryStore::default();
        let outcome = import_csv(&store, SCENARIO_CSV).await;

        assert_eq!(outcome.processed.households, 1);
        assert_eq!(outcome.processed.guests, 3);
        assert!(outcome.errors.is_empty());
        assert!(outcome.results.iter().all(|r| r.success));

        let household = store.household_named("Smith Family").unwrap();
        assert_eq!(household.name, "Smith Family");
        assert_eq!(household.code.len(), HOUSEHOLD_CODE_LENGTH);

        let guests = store.guests_of(household.id);
        assert_eq!(guests.len(), 3);
        for guest in &guests {
            assert_eq!(guest.is_child, guest.name == "Billy Smith");
            assert!(!guest.is_teenager);
            assert_eq!(guest.is_attending, None);
        }
        let john = guests.iter().find(|g| g.name == "John Smith").unwrap();
        assert_eq!(john.email.as_deref(), Some("john@example.com"));
        let billy = guests.iter().find(|g| g.name == "Billy Smith").unwrap();
        assert_eq!(billy.email, None);
    }

    #[tokio::test]
    async fn test_reimport_reports_every_guest_as_duplicate() {
        let store = MemoryStore::default();
        import_csv(&store, SCENARIO_CSV).await;
        let second = import_csv(&store, SCENARIO_CSV).await;

        assert_eq!(second.processed.households, 0);
        assert_eq!(second.processed.guests, 0);
        assert_eq!(second.skipped.duplicates, 3);
        assert_eq!(second.results.len(), 3);
        assert!(second
            .results
            .iter()
            .all(|r| !r.success && r.error.as_deref() == Some(DUPLICATE_GUEST)));
        assert_eq!(store.guests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_household_names_differing_in_case_share_one_household() {
        let store = MemoryStore::default();
        let outcome = reconcile(
            &store,
            vec![record("Ann", "Smith Family"), record("Bo", "smith family")],
            0,
        )
        .await;

        assert_eq!(outcome.processed.households, 1);
        assert_eq!(outcome.processed.guests, 2);
        assert_eq!(store.households.lock().unwrap().len(), 1);
        let household = store.household_named("SMITH FAMILY").unwrap();
        assert_eq!(store.guests_of(household.id).len(), 2);
    }

    #[tokio::test]
    async fn test_existing_household_is_reused_with_original_casing() {
        let store = MemoryStore::default();
        reconcile(&store, vec![record("Ann", "Lee House")], 0).await;
        let outcome = reconcile(&store, vec![record("Bo", "LEE HOUSE")], 0).await;

        assert_eq!(outcome.processed.households, 0);
        assert_eq!(outcome.processed.guests, 1);
        assert_eq!(store.households.lock().unwrap()[0].name, "Lee House");
    }

    #[tokio::test]
    async fn test_row_with_empty_name_is_silently_dropped() {
        let store = MemoryStore::default();
        let outcome = import_csv(
            &store,
            "Name,Email,Household,Child,Teenager\n,,Household X,,\nAnn,,Household Y,,\n",
        )
        .await;

        assert_eq!(outcome.processed.guests, 1);
        assert_eq!(outcome.skipped.invalid_rows, 1);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.results.len(), 1);
        assert!(store.household_named("Household X").is_none());
    }

    #[tokio::test]
    async fn test_intra_batch_duplicates_are_caught() {
        let store = MemoryStore::default();
        let outcome = reconcile(
            &store,
            vec![
                record("Ann Lee", "Lee House"),
                record("ann lee", "Lee House"),
                record("Bo Lee", "Lee House"),
            ],
            0,
        )
        .await;

        assert_eq!(outcome.processed.guests, 2);
        assert_eq!(outcome.skipped.duplicates, 1);
        assert_eq!(outcome.results[1].error.as_deref(), Some(DUPLICATE_GUEST));
    }

    #[tokio::test]
    async fn test_household_failure_is_isolated() {
        let store = MemoryStore {
            failing_households: HashSet::from(["broken house".to_string()]),
            ..Default::default()
        };
        let outcome = reconcile(
            &store,
            vec![
                record("Ann", "Broken House"),
                record("Bo", "Good House"),
                record("Cy", "Broken House"),
            ],
            0,
        )
        .await;

        assert_eq!(outcome.processed.households, 1);
        assert_eq!(outcome.processed.guests, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("Broken House"));
        assert!(!outcome.errors[0].contains("connection reset"));

        let failed: Vec<_> = outcome
            .results
            .iter()
            .filter(|r| r.error.as_deref() == Some(HOUSEHOLD_PROCESSING_FAILED))
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(failed, vec!["Ann", "Cy"]);
        assert!(outcome.has_failures());
    }

    #[tokio::test]
    async fn test_guest_insert_failure_abandons_rest_of_household() {
        let store = MemoryStore {
            failing_guests: HashSet::from(["bo".to_string()]),
            ..Default::default()
        };
        let outcome = reconcile(
            &store,
            vec![
                record("Ann", "H1"),
                record("Bo", "H1"),
                record("Cy", "H1"),
                record("Di", "H2"),
            ],
            0,
        )
        .await;

        assert_eq!(outcome.processed.guests, 2);
        assert_eq!(outcome.errors.len(), 1);
        let statuses: Vec<(&str, bool)> = outcome
            .results
            .iter()
            .map(|r| (r.name.as_str(), r.success))
            .collect();
        assert_eq!(
            statuses,
            vec![("Ann", true), ("Bo", false), ("Cy", false), ("Di", true)]
        );
        assert_eq!(outcome.results[1].error.as_deref(), Some("database error"));
        assert_eq!(
            outcome.results[2].error.as_deref(),
            Some(HOUSEHOLD_PROCESSING_FAILED)
        );
        assert_eq!(outcome.errors[0], "Failed to process household H1: database error");
        assert_eq!(outcome.failed_count(), 2);
    }

    #[tokio::test]
    async fn test_database_error_text_only_with_details() {
        let store = MemoryStore {
            failing_guests: HashSet::from(["bo".to_string()]),
            ..Default::default()
        };
        let outcome =
            reconcile_with_details(&store, vec![record("Bo", "H1"), record("Cy", "H1")], 0, true)
                .await;

        assert_eq!(
            outcome.results[0].error.as_deref(),
            Some("database error: insert timed out")
        );
        assert!(outcome.errors[0].contains("insert timed out"));
    }

    #[test]
    fn test_client_message_keeps_conflict_text() {
        assert_eq!(
            StoreError::CodeAllocationFailed(5).client_message(false),
            "could not allocate a unique household code after 5 attempts"
        );
        assert_eq!(
            StoreError::Database("relation missing".to_string()).client_message(false),
            "database error"
        );
    }

    /// Feeds rows through the reconciler chunk by chunk, the way the upload
    /// client submits them, and sums the per-chunk responses.
    #[tokio::test]
    async fn test_chunked_import_counts_each_guest_once() {
        use crate::models::guest_import::{BatchImportResponse, IMPORT_BATCH_SIZE};
        use crate::services::batching::{chunk_records, BatchTotals};
        use std::time::Duration;

        // 20 distinct guests in households of 3, so "Household 3" (guests
        // 9-11) spans the first chunk boundary, plus 3 repeats of earlier
        // guests that land in the last chunk.
        let mut rows: Vec<RawGuestRecord> = (0..20)
            .map(|i| {
                RawGuestRecord::from_pairs([
                    ("Name".to_string(), format!("Guest {}", i)),
                    ("Household".to_string(), format!("Household {}", i / 3)),
                ])
            })
            .collect();
        rows.push(RawGuestRecord::from_pairs([("Name", "guest 1"), ("Household", "HOUSEHOLD 0")]));
        rows.push(RawGuestRecord::from_pairs([("Name", "Guest 7"), ("Household", "Household 2")]));
        rows.push(RawGuestRecord::from_pairs([("Name", "Guest 19"), ("Household", "household 6")]));
        assert_eq!(rows.len(), 23);

        let store = MemoryStore::default();
        let mut totals = BatchTotals::default();
        let chunks = chunk_records(&rows, IMPORT_BATCH_SIZE);
        assert_eq!(chunks.len(), 3);
        for chunk in chunks {
            let (records, dropped) = prepare_raw_records(chunk);
            let outcome = reconcile(&store, records, dropped).await;
            totals.absorb(BatchImportResponse::from_outcome(outcome, Duration::from_millis(1)));
        }

        assert_eq!(totals.processed.guests, 20);
        assert_eq!(totals.processed.households, 7);
        assert_eq!(totals.skipped.duplicates, 3);
        assert_eq!(totals.results.len(), 23);
        assert_eq!(store.guests.lock().unwrap().len(), 20);
        assert_eq!(store.households.lock().unwrap().len(), 7);
        let spanning = store.household_named("Household 3").unwrap();
        assert_eq!(store.guests_of(spanning.id).len(), 3);
    }

    #[tokio::test]
    async fn test_code_collision_is_retried() {
        let store = MemoryStore {
            code_collisions: 2.into(),
            ..Default::default()
        };
        let outcome = reconcile(&store, vec![record("Ann", "H1")], 0).await;

        assert_eq!(outcome.processed.households, 1);
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_code_collisions_exhaust_attempts() {
        let store = MemoryStore {
            code_collisions: MAX_CODE_ATTEMPTS.into(),
            ..Default::default()
        };
        let outcome = reconcile(&store, vec![record("Ann", "H1")], 0).await;

        assert_eq!(outcome.processed.households, 0);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(
            outcome.results[0].error.as_deref(),
            Some(HOUSEHOLD_PROCESSING_FAILED)
        );
    }

    #[tokio::test]
    async fn test_concurrent_household_create_reuses_winner() {
        let store = MemoryStore {
            race_on_create: true,
            ..Default::default()
        };
        let outcome = reconcile(&store, vec![record("Ann", "Smith Family")], 0).await;

        assert_eq!(outcome.processed.households, 0);
        assert_eq!(outcome.processed.guests, 1);
        assert_eq!(store.households.lock().unwrap().len(), 1);
        assert_eq!(store.household_named("Smith Family").unwrap().code, "RACE01");
    }

    #[tokio::test]
    async fn test_results_follow_group_then_row_order() {
        let store = MemoryStore::default();
        let names: Vec<String> = (0..6).map(|_| Name().fake()).collect();
        let outcome = reconcile(
            &store,
            vec![
                record(&format!("{} 0", names[0]), "A"),
                record(&format!("{} 1", names[1]), "B"),
                record(&format!("{} 2", names[2]), "a"),
                record(&format!("{} 3", names[3]), "B"),
            ],
            0,
        )
        .await;

        let order: Vec<&str> = outcome
            .results
            .iter()
            .map(|r| r.name.rsplit(' ').next().unwrap())
            .collect();
        assert_eq!(order, vec!["0", "2", "1", "3"]);
        assert_eq!(outcome.results[1].household_name, "A");
    }
}
