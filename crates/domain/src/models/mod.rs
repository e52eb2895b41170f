//! Domain models for the wedding planner.

pub mod guest;
pub mod guest_import;
pub mod household;

pub use guest::{Guest, NewGuest};
pub use guest_import::{
    is_affirmative_flag, BatchImportResponse, GuestField, GuestRecord, ImportOutcome,
    ProcessedCounts, ProcessingResult, RawGuestRecord, RawRecordsRequest, SkippedCounts,
    TextGuestsImportResponse, TypedGuestsRequest, CLIENT_IMPORT_TIMEOUT_SECS, DUPLICATE_GUEST,
    HOUSEHOLD_PROCESSING_FAILED, IMPORT_BATCH_SIZE, MAX_RECORDS_PER_REQUEST,
};
pub use household::{
    generate_household_code, is_valid_household_code, normalize_household_code, Household,
    HouseholdGuestName, HouseholdSummary, HouseholdWithGuests, HOUSEHOLD_CODE_LENGTH,
};
