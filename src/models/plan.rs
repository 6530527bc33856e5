use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_period", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanPeriod {
    Monthly,
    Yearly,
}

/// Immutable catalog entry. Yearly variants denormalize the quotas of
/// their monthly counterpart and point back at it via `base_plan_id`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub base_plan_id: Option<Uuid>,
    pub label: String,
    /// Minor currency units.
    pub price: i64,
    pub period: PlanPeriod,
    pub discount_percent: Option<f64>,
    pub storage_quota: i64,
    pub lot_quota: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPlan {
    pub base_plan_id: Option<Uuid>,
    pub label: String,
    pub price: i64,
    pub period: PlanPeriod,
    pub discount_percent: Option<f64>,
    pub storage_quota: i64,
    pub lot_quota: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_wire_names() {
        assert_eq!(serde_json::to_string(&PlanPeriod::Monthly).unwrap(), "\"monthly\"");
        assert_eq!(serde_json::to_string(&PlanPeriod::Yearly).unwrap(), "\"yearly\"");
        assert_eq!(
            serde_json::from_str::<PlanPeriod>("\"yearly\"").unwrap(),
            PlanPeriod::Yearly
        );
    }
}
