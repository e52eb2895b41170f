//! Guest import services.

pub mod batching;
pub mod reconciler;
pub mod record_parser;

pub use batching::{chunk_count, chunk_records, split_submittable, BatchTotals, ProgressTracker};
pub use reconciler::{
    group_by_household, prepare_raw_records, prepare_typed_records, reconcile,
    reconcile_with_details, resolve_household, GuestStore, HouseholdGroup, StoreError,
    MAX_CODE_ATTEMPTS,
};
pub use record_parser::{detect_delimiter, parse_records, ParseError, ParsedRecords};
