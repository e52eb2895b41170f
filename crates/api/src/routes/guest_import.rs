//! Guest import route handlers.
//!
//! Every endpoint funnels into the same reconciliation pass; the handlers
//! only differ in how the request body is decoded and how the outcome is
//! rendered.

use axum::{
    extract::{multipart::MultipartRejection, rejection::StringRejection, Multipart, State},
    Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use domain::models::{
    BatchImportResponse, GuestRecord, ImportOutcome, RawRecordsRequest,
    TextGuestsImportResponse, TypedGuestsRequest,
};
use domain::services::{
    parse_records, prepare_raw_records, prepare_typed_records, reconcile_with_details,
};
use persistence::PgGuestStore;
use std::time::{Duration, Instant};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminAccess, AppJson};
use crate::middleware::metrics::{record_import_outcome, record_invalid_rows};

/// Multipart field carrying the JSON payload on `upload-batch`.
pub const DATA_FIELD: &str = "data";

const NO_VALID_RECORDS: &str =
    "No valid guest records found. Every row needs a Name and a Household.";

/// Create guest import routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/upload-batch", post(upload_batch))
        .route("/api/admin/import-text", post(import_text))
        .route("/api/admin/import-text-guests", post(import_text_guests))
        .route("/api/admin/import-csv", post(import_csv))
}

/// Import one chunk sent by the batch upload client.
///
/// POST /api/admin/upload-batch (multipart, JSON in field `data`)
async fn upload_batch(
    State(state): State<AppState>,
    Extension(access): Extension<AdminAccess>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchImportResponse>, ApiError> {
    let started = Instant::now();
    let request = read_data_field(multipart?).await?;
    let response = import_raw_records(&state, access, "upload-batch", request, started).await?;
    Ok(Json(response))
}

/// Import header-keyed rows sent as JSON.
///
/// POST /api/admin/import-text
async fn import_text(
    State(state): State<AppState>,
    Extension(access): Extension<AdminAccess>,
    AppJson(request): AppJson<RawRecordsRequest>,
) -> Result<Json<BatchImportResponse>, ApiError> {
    let started = Instant::now();
    let response = import_raw_records(&state, access, "import-text", request, started).await?;
    Ok(Json(response))
}

/// Import delimited text parsed on the server.
///
/// POST /api/admin/import-csv (text body, first line is the header row)
async fn import_csv(
    State(state): State<AppState>,
    Extension(access): Extension<AdminAccess>,
    body: Result<String, StringRejection>,
) -> Result<Json<BatchImportResponse>, ApiError> {
    let started = Instant::now();
    let parsed = parse_records(&body?)?;
    if parsed.records.is_empty() {
        return Err(ApiError::Validation(NO_VALID_RECORDS.to_string()));
    }

    let request = RawRecordsRequest {
        records: parsed.records,
    };
    let response = import_raw_records(&state, access, "import-csv", request, started).await?;
    Ok(Json(response))
}

/// Import pre-typed guests from the pasted-text importer.
///
/// POST /api/admin/import-text-guests
///
/// Returns 207 Multi-Status when some households or guests failed to persist.
async fn import_text_guests(
    State(state): State<AppState>,
    Extension(access): Extension<AdminAccess>,
    AppJson(request): AppJson<TypedGuestsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    check_request_size(&state, request.guests.len())?;
    request.validate()?;

    let (records, dropped) = prepare_typed_records(request.guests);
    let outcome = run_import(&state, access, "import-text-guests", records, dropped).await?;
    let response = TextGuestsImportResponse::from_outcome(&outcome, started.elapsed());

    let status = if outcome.has_failures() {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

/// Pulls the `data` field out of a multipart body and decodes it.
async fn read_data_field(mut multipart: Multipart) -> Result<RawRecordsRequest, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(DATA_FIELD) {
            continue;
        }
        let text = field.text().await?;
        return serde_json::from_str(&text)
            .map_err(|e| ApiError::Validation(format!("Invalid JSON in data field: {}", e)));
    }

    Err(ApiError::Validation(format!(
        "Missing multipart field '{}'",
        DATA_FIELD
    )))
}

async fn import_raw_records(
    state: &AppState,
    access: AdminAccess,
    endpoint: &'static str,
    request: RawRecordsRequest,
    started: Instant,
) -> Result<BatchImportResponse, ApiError> {
    check_request_size(state, request.records.len())?;
    request.validate()?;

    let (records, dropped) = prepare_raw_records(&request.records);
    let outcome = run_import(state, access, endpoint, records, dropped).await?;
    Ok(BatchImportResponse::from_outcome(outcome, started.elapsed()))
}

fn check_request_size(state: &AppState, count: usize) -> Result<(), ApiError> {
    let limit = state.config.import.max_records_per_request;
    if count > limit {
        return Err(ApiError::PayloadTooLarge(format!(
            "At most {} records per request, got {}",
            limit, count
        )));
    }
    Ok(())
}

/// Runs the reconciler under the configured processing deadline.
///
/// Rows written before the deadline stay committed; re-submitting the same
/// input skips them as duplicates.
async fn run_import(
    state: &AppState,
    access: AdminAccess,
    endpoint: &'static str,
    records: Vec<GuestRecord>,
    dropped: u32,
) -> Result<ImportOutcome, ApiError> {
    if records.is_empty() {
        record_invalid_rows(endpoint, dropped);
        return Err(ApiError::Validation(NO_VALID_RECORDS.to_string()));
    }

    info!(
        endpoint,
        ?access,
        records = records.len(),
        invalid_rows = dropped,
        "Starting guest import"
    );

    let store = PgGuestStore::new(state.pool.clone());
    let deadline = Duration::from_secs(state.config.import.processing_timeout_secs);

    let expose_details = state.config.server.expose_error_details;
    let import = reconcile_with_details(&store, records, dropped, expose_details);
    let outcome = tokio::time::timeout(deadline, import)
        .await
        .map_err(|_| {
            ApiError::GatewayTimeout(format!(
                "Import did not finish within {} seconds. Rows already saved are kept; \
                 re-submit the file to import the rest.",
                deadline.as_secs()
            ))
        })?;

    record_import_outcome(endpoint, &outcome);
    Ok(outcome)
}
