//! Household entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the households table.
#[derive(Debug, Clone, FromRow)]
pub struct HouseholdEntity {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<HouseholdEntity> for domain::models::Household {
    fn from(entity: HouseholdEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            code: entity.code,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Household row with its guest count, for listings.
#[derive(Debug, Clone, FromRow)]
pub struct HouseholdSummaryEntity {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub guest_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<HouseholdSummaryEntity> for domain::models::HouseholdSummary {
    fn from(entity: HouseholdSummaryEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            code: entity.code,
            guest_count: entity.guest_count,
            created_at: entity.created_at,
        }
    }
}
