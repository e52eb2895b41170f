//! Guest entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the guests table.
#[derive(Debug, Clone, FromRow)]
pub struct GuestEntity {
    pub id: Uuid,
    pub household_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub is_attending: Option<bool>,
    pub is_child: bool,
    pub is_teenager: bool,
    pub meal_option_id: Option<Uuid>,
    pub dessert_option_id: Option<Uuid>,
    pub dietary_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GuestEntity> for domain::models::Guest {
    fn from(entity: GuestEntity) -> Self {
        Self {
            id: entity.id,
            household_id: entity.household_id,
            name: entity.name,
            email: entity.email,
            is_attending: entity.is_attending,
            is_child: entity.is_child,
            is_teenager: entity.is_teenager,
            meal_option_id: entity.meal_option_id,
            dessert_option_id: entity.dessert_option_id,
            dietary_notes: entity.dietary_notes,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Id and name of a guest, used for duplicate detection.
#[derive(Debug, Clone, FromRow)]
pub struct GuestNameEntity {
    pub id: Uuid,
    pub name: String,
}

impl From<GuestNameEntity> for domain::models::HouseholdGuestName {
    fn from(entity: GuestNameEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
        }
    }
}
