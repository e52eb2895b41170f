//! Guest repository for database operations.

use domain::models::NewGuest;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::GuestEntity;
use crate::metrics::QueryTimer;

/// Unique index enforcing one case-insensitive guest name per household.
pub const GUEST_NAME_CONSTRAINT: &str = "guests_household_name_lower_key";

/// Repository for guest-related database operations.
#[derive(Clone)]
pub struct GuestRepository {
    pool: PgPool,
}

impl GuestRepository {
    /// Creates a new GuestRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a guest into a household.
    ///
    /// Attendance and meal choices start unset.
    pub async fn create(
        &self,
        household_id: Uuid,
        guest: &NewGuest,
    ) -> Result<GuestEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_guest");
        let result = sqlx::query_as::<_, GuestEntity>(
            r#"
            INSERT INTO guests (household_id, name, email, is_child, is_teenager, dietary_notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, household_id, name, email, is_attending, is_child, is_teenager,
                      meal_option_id, dessert_option_id, dietary_notes, created_at, updated_at
            "#,
        )
        .bind(household_id)
        .bind(&guest.name)
        .bind(guest.email.as_deref())
        .bind(guest.is_child)
        .bind(guest.is_teenager)
        .bind(guest.dietary_notes.as_deref())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// All guests of a household, in creation order.
    pub async fn list_by_household(
        &self,
        household_id: Uuid,
    ) -> Result<Vec<GuestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_guests_by_household");
        let result = sqlx::query_as::<_, GuestEntity>(
            r#"
            SELECT id, household_id, name, email, is_attending, is_child, is_teenager,
                   meal_option_id, dessert_option_id, dietary_notes, created_at, updated_at
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
}
