//! Household repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GuestNameEntity, HouseholdEntity, HouseholdSummaryEntity};
use crate::metrics::QueryTimer;

/// Unique index enforcing case-insensitive household names.
pub const HOUSEHOLD_NAME_CONSTRAINT: &str = "households_name_lower_key";

/// Unique constraint on household access codes.
pub const HOUSEHOLD_CODE_CONSTRAINT: &str = "households_code_key";

/// Repository for household-related database operations.
#[derive(Clone)]
pub struct HouseholdRepository {
    pool: PgPool,
}

impl HouseholdRepository {
    /// Creates a new HouseholdRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a household with the given name and access code.
    pub async fn create(&self, name: &str, code: &str) -> Result<HouseholdEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_household");
        let result = sqlx::query_as::<_, HouseholdEntity>(
            r#"
            INSERT INTO households (name, code)
            VALUES ($1, $2)
            RETURNING id, name, code, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(code)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a household by name, ignoring case.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<HouseholdEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_household_by_name");
        let result = sqlx::query_as::<_, HouseholdEntity>(
            r#"
            SELECT id, name, code, created_at, updated_at
            FROM households
            WHERE LOWER(name) = LOWER($1)
            "#,
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a household by its access code.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<HouseholdEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_household_by_code");
        let result = sqlx::query_as::<_, HouseholdEntity>(
            r#"
            SELECT id, name, code, created_at, updated_at
            FROM households
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Id and name of every guest in a household, in creation order.
    pub async fn guest_names(&self, household_id: Uuid) -> Result<Vec<GuestNameEntity>, sqlx::Error> {
        let timer = QueryTimer::new("household_guest_names");
        let result = sqlx::query_as::<_, GuestNameEntity>(
            r#"
            SELECT id, name
            FROM guests
            WHERE household_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List households with guest counts, ordered by name.
    pub async fn list_with_guest_counts(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HouseholdSummaryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_households");
        let result = sqlx::query_as::<_, HouseholdSummaryEntity>(
            r#"
            SELECT h.id, h.name, h.code, h.created_at,
                   (SELECT COUNT(*) FROM guests g WHERE g.household_id = h.id) AS guest_count
            FROM households h
            ORDER BY LOWER(h.name), h.id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Total number of households.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_households");
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM households")
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }
}
