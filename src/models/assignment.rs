use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{Plan, PlanUsage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "exchange_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    /// Fresh purchase; any prior inactive history is ignored.
    Contract,
    /// Switch from the currently active plan; unused quota carries over.
    Change,
}

/// The quota actually granted to an assignment, frozen at exchange time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitSnapshot {
    pub lot_available: i64,
    pub storage_available: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct PlanAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub lot_available: i64,
    pub storage_available: i64,
    pub active: bool,
    pub exchange_kind: ExchangeKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanAssignment {
    pub fn benefits(&self) -> BenefitSnapshot {
        BenefitSnapshot {
            lot_available: self.lot_available,
            storage_available: self.storage_available,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub benefits: BenefitSnapshot,
    pub exchange_kind: ExchangeKind,
}

#[derive(Debug, Deserialize)]
pub struct ContractPlanRequest {
    pub plan_reference: Option<Uuid>,
    pub exchange_type: Option<ExchangeKind>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub benefits: BenefitSnapshot,
    pub active: bool,
    pub exchange_kind: ExchangeKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<PlanUsage>,
}

impl AssignmentResponse {
    pub fn new(assignment: PlanAssignment, plan: Option<Plan>, usage: Option<PlanUsage>) -> Self {
        let benefits = assignment.benefits();
        Self {
            id: assignment.id,
            user_id: assignment.user_id,
            plan_id: assignment.plan_id,
            expires_at: assignment.expires_at,
            benefits,
            active: assignment.active,
            exchange_kind: assignment.exchange_kind,
            created_at: assignment.created_at,
            updated_at: assignment.updated_at,
            plan,
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_kind_wire_names() {
        assert_eq!(serde_json::to_string(&ExchangeKind::Contract).unwrap(), "\"contract\"");
        assert_eq!(serde_json::to_string(&ExchangeKind::Change).unwrap(), "\"change\"");
        assert_eq!(
            serde_json::from_str::<ExchangeKind>("\"change\"").unwrap(),
            ExchangeKind::Change
        );
    }

    #[test]
    fn test_contract_request_accepts_partial_body() {
        let request: ContractPlanRequest = serde_json::from_str("{}").unwrap();
        assert!(request.plan_reference.is_none());
        assert!(request.exchange_type.is_none());
    }
}
