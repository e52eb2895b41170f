//! Postgres-backed [`GuestStore`] used by the import endpoints.

use async_trait::async_trait;
use domain::models::{Guest, Household, HouseholdWithGuests, NewGuest};
use domain::services::{GuestStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repositories::{
    GuestRepository, HouseholdRepository, GUEST_NAME_CONSTRAINT, HOUSEHOLD_CODE_CONSTRAINT,
    HOUSEHOLD_NAME_CONSTRAINT,
};

/// PostgreSQL unique_violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Guest store over the households and guests tables.
///
/// Each operation is its own statement; there is no transaction spanning a
/// household's guests.
#[derive(Clone)]
pub struct PgGuestStore {
    households: HouseholdRepository,
    guests: GuestRepository,
}

impl PgGuestStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            households: HouseholdRepository::new(pool.clone()),
            guests: GuestRepository::new(pool),
        }
    }
}

/// Maps unique violations onto the store's conflict variants.
pub fn map_store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            tracing::debug!(constraint = ?db_err.constraint(), "Unique violation during import");
            match db_err.constraint() {
                Some(HOUSEHOLD_NAME_CONSTRAINT) => return StoreError::HouseholdNameTaken,
                Some(HOUSEHOLD_CODE_CONSTRAINT) => return StoreError::HouseholdCodeTaken,
                Some(GUEST_NAME_CONSTRAINT) => return StoreError::GuestNameTaken,
                _ => {}
            }
        }
    }
    StoreError::Database(err.to_string())
}

#[async_trait]
impl GuestStore for PgGuestStore {
    async fn find_household_by_name(
        &self,
        name: &str,
    ) -> Result<Option<HouseholdWithGuests>, StoreError> {
        let Some(household) = self
            .households
            .find_by_name(name)
            .await
            .map_err(map_store_error)?
        else {
            return Ok(None);
        };

        let guests = self
            .households
            .guest_names(household.id)
            .await
            .map_err(map_store_error)?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(Some(HouseholdWithGuests {
            household: household.into(),
            guests,
        }))
    }

    async fn create_household(&self, name: &str, code: &str) -> Result<Household, StoreError> {
        self.households
            .create(name, code)
            .await
            .map(Into::into)
            .map_err(map_store_error)
    }

    async fn insert_guest(
        &self,
        household_id: Uuid,
        guest: &NewGuest,
    ) -> Result<Guest, StoreError> {
        self.guests
            .create(household_id, guest)
            .await
            .map(Into::into)
            .map_err(map_store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_map_to_database_variant() {
        let err = map_store_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_pool_timeout_maps_to_database_variant() {
        let err = map_store_error(sqlx::Error::PoolTimedOut);
        match err {
            StoreError::Database(msg) => assert!(msg.contains("timed out")),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
