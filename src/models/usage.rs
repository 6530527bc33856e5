use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Consumed quota against one assignment. Created zeroed alongside the
/// assignment; incremented by external collaborators as files land.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlanUsage {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub lot_used: i64,
    pub storage_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageTotals {
    pub lot_used: i64,
    pub storage_used: i64,
}

impl From<&PlanUsage> for UsageTotals {
    fn from(usage: &PlanUsage) -> Self {
        Self {
            lot_used: usage.lot_used,
            storage_used: usage.storage_used,
        }
    }
}
