//! Household route handlers.
//!
//! The admin listing is used to verify an import; the code lookup is the
//! guest-facing entry point to a household's RSVP.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use domain::models::{
    is_valid_household_code, normalize_household_code, Guest, HouseholdSummary,
    HOUSEHOLD_CODE_LENGTH,
};
use persistence::repositories::{GuestRepository, HouseholdRepository};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

const DEFAULT_PAGE_SIZE: i64 = 50;

/// Admin household routes.
pub fn admin_router() -> Router<AppState> {
    Router::new().route("/api/admin/households", get(list_households))
}

/// Guest-facing household routes.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/households/:code", get(get_household_by_code))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListHouseholdsQuery {
    #[validate(range(min = 1, max = 200, message = "limit must be between 1 and 200"))]
    pub limit: Option<i64>,
    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdListResponse {
    pub households: Vec<HouseholdSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Household as shown to its guests.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdDetailResponse {
    pub name: String,
    pub code: String,
    pub guests: Vec<HouseholdGuestView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdGuestView {
    pub id: Uuid,
    pub name: String,
    pub is_attending: Option<bool>,
    pub is_child: bool,
    pub is_teenager: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<Guest> for HouseholdGuestView {
    fn from(guest: Guest) -> Self {
        Self {
            id: guest.id,
            name: guest.name,
            is_attending: guest.is_attending,
            is_child: guest.is_child,
            is_teenager: guest.is_teenager,
            updated_at: guest.updated_at,
        }
    }
}

/// List households with guest counts, ordered by name.
///
/// GET /api/admin/households?limit=&offset=
async fn list_households(
    State(state): State<AppState>,
    query: Result<Query<ListHouseholdsQuery>, QueryRejection>,
) -> Result<Json<HouseholdListResponse>, ApiError> {
    let Query(query) = query?;
    query.validate()?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let repo = HouseholdRepository::new(state.pool.clone());
    let households = repo
        .list_with_guest_counts(limit, offset)
        .await?
        .into_iter()
        .map(HouseholdSummary::from)
        .collect();
    let total = repo.count().await?;

    Ok(Json(HouseholdListResponse {
        households,
        total,
        limit,
        offset,
    }))
}

/// Look up a household by its access code.
///
/// GET /api/households/:code
async fn get_household_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<HouseholdDetailResponse>, ApiError> {
    let code = normalize_household_code(&code);
    if !is_valid_household_code(&code) {
        return Err(ApiError::Validation(format!(
            "Household code must be {} letters or digits",
            HOUSEHOLD_CODE_LENGTH
        )));
    }

    let household = HouseholdRepository::new(state.pool.clone())
        .find_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Household not found".to_string()))?;

    let guests = GuestRepository::new(state.pool.clone())
        .list_by_household(household.id)
        .await?
        .into_iter()
        .map(|entity| HouseholdGuestView::from(Guest::from(entity)))
        .collect();

    Ok(Json(HouseholdDetailResponse {
        name: household.name,
        code: household.code,
        guests,
    }))
}
