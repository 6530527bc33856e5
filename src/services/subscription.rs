use chrono::{DateTime, Months, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::queries::{AssignmentQueries, PlanQueries, UsageQueries};
use crate::errors::{AppError, Result};
use crate::models::{
    AssignmentResponse, BenefitSnapshot, ExchangeKind, NewAssignment, Plan, PlanPeriod,
    UsageTotals,
};

/// One calendar month for monthly plans, twelve for yearly.
pub fn expiry_for(period: PlanPeriod, now: DateTime<Utc>) -> DateTime<Utc> {
    let months = match period {
        PlanPeriod::Monthly => 1,
        PlanPeriod::Yearly => 12,
    };
    now.checked_add_months(Months::new(months)).unwrap_or(now)
}

/// Computes the benefit snapshot for a new assignment.
///
/// A `contract` grants the target plan's raw quotas. A `change` adds the
/// unused remainder of the previous snapshot on top of them, clamped at
/// zero per dimension so drifted usage counters can never subtract from
/// the new plan's quota.
pub fn compute_benefit_snapshot(
    kind: ExchangeKind,
    plan: &Plan,
    previous: Option<(BenefitSnapshot, UsageTotals)>,
) -> BenefitSnapshot {
    match (kind, previous) {
        (ExchangeKind::Change, Some((prev, used))) => BenefitSnapshot {
            lot_available: plan.lot_quota + (prev.lot_available - used.lot_used).max(0),
            storage_available: plan.storage_quota
                + (prev.storage_available - used.storage_used).max(0),
        },
        _ => BenefitSnapshot {
            lot_available: plan.lot_quota,
            storage_available: plan.storage_quota,
        },
    }
}

fn write_failure(err: AppError) -> AppError {
    match err {
        AppError::Database(e) => AppError::Transaction(e),
        other => other,
    }
}

/// The plan-exchange transaction.
///
/// Locks the user's active assignment, computes the carryover snapshot,
/// then deactivates the old assignment and inserts the new one plus a
/// zeroed usage row. All three writes commit or roll back together; a
/// partial switch is never observable.
pub async fn contract_or_change(
    pool: &PgPool,
    user_id: Uuid,
    plan_id: Uuid,
    kind: ExchangeKind,
) -> Result<AssignmentResponse> {
    let plan = PlanQueries::find_by_id(pool, plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))?;

    let mut tx = pool.begin().await?;

    let current = AssignmentQueries::lock_active_for_user(&mut *tx, user_id).await?;

    if let Some(ref active) = current {
        if active.plan_id == plan.id {
            return Err(AppError::Conflict(
                "User is already subscribed to this plan".to_string(),
            ));
        }
    }

    let previous = match (kind, &current) {
        (ExchangeKind::Change, Some(active)) => {
            let totals = UsageQueries::totals_for_assignment(&mut *tx, active.id).await?;
            Some((active.benefits(), totals))
        }
        _ => None,
    };

    let new_assignment = NewAssignment {
        user_id,
        plan_id: plan.id,
        expires_at: expiry_for(plan.period, Utc::now()),
        benefits: compute_benefit_snapshot(kind, &plan, previous),
        exchange_kind: kind,
    };

    AssignmentQueries::deactivate_for_user(&mut *tx, user_id)
        .await
        .map_err(write_failure)?;
    let assignment = AssignmentQueries::insert(&mut *tx, &new_assignment)
        .await
        .map_err(write_failure)?;
    let usage = UsageQueries::init(&mut *tx, assignment.id)
        .await
        .map_err(write_failure)?;

    tx.commit().await.map_err(AppError::Transaction)?;

    tracing::info!(
        user_id = %user_id,
        plan_id = %plan.id,
        kind = ?kind,
        lot_available = assignment.lot_available,
        storage_available = assignment.storage_available,
        "plan exchange committed"
    );

    Ok(AssignmentResponse::new(assignment, Some(plan), Some(usage)))
}

/// Read path used by `me`, `show` and the login/refresh responses.
pub async fn active_assignment_with_plan(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<AssignmentResponse>> {
    let Some(assignment) = AssignmentQueries::find_active_for_user(pool, user_id).await? else {
        return Ok(None);
    };

    let plan = PlanQueries::find_by_id(pool, assignment.plan_id).await?;
    Ok(Some(AssignmentResponse::new(assignment, plan, None)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn plan(lot_quota: i64, storage_quota: i64, period: PlanPeriod) -> Plan {
        let now = Utc::now();
        Plan {
            id: Uuid::new_v4(),
            base_plan_id: None,
            label: "Pro".to_string(),
            price: 19700,
            period,
            discount_percent: None,
            storage_quota,
            lot_quota,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_change_carries_over_unused_quota() {
        let target = plan(2500, 25000, PlanPeriod::Monthly);
        let previous = BenefitSnapshot {
            lot_available: 1000,
            storage_available: 10000,
        };
        let used = UsageTotals {
            lot_used: 200,
            storage_used: 3000,
        };

        let snapshot =
            compute_benefit_snapshot(ExchangeKind::Change, &target, Some((previous, used)));

        assert_eq!(snapshot.lot_available, 3300);
        assert_eq!(snapshot.storage_available, 32000);
    }

    #[test]
    fn test_carryover_clamps_at_zero() {
        let target = plan(2500, 25000, PlanPeriod::Monthly);
        let previous = BenefitSnapshot {
            lot_available: 1000,
            storage_available: 10000,
        };
        // usage drifted past the snapshot
        let used = UsageTotals {
            lot_used: 1200,
            storage_used: 15000,
        };

        let snapshot =
            compute_benefit_snapshot(ExchangeKind::Change, &target, Some((previous, used)));

        assert_eq!(snapshot.lot_available, 2500);
        assert_eq!(snapshot.storage_available, 25000);
    }

    #[test]
    fn test_contract_ignores_previous_plan() {
        let target = plan(1000, 10000, PlanPeriod::Monthly);
        let previous = BenefitSnapshot {
            lot_available: 9999,
            storage_available: 99999,
        };
        let used = UsageTotals::default();

        let snapshot =
            compute_benefit_snapshot(ExchangeKind::Contract, &target, Some((previous, used)));

        assert_eq!(snapshot.lot_available, 1000);
        assert_eq!(snapshot.storage_available, 10000);
    }

    #[test]
    fn test_change_without_previous_degrades_to_raw_quotas() {
        let target = plan(1000, 10000, PlanPeriod::Monthly);

        let snapshot = compute_benefit_snapshot(ExchangeKind::Change, &target, None);

        assert_eq!(snapshot.lot_available, 1000);
        assert_eq!(snapshot.storage_available, 10000);
    }

    #[test]
    fn test_untouched_previous_plan_carries_fully() {
        let target = plan(2500, 25000, PlanPeriod::Monthly);
        let previous = BenefitSnapshot {
            lot_available: 1000,
            storage_available: 10000,
        };

        let snapshot = compute_benefit_snapshot(
            ExchangeKind::Change,
            &target,
            Some((previous, UsageTotals::default())),
        );

        assert_eq!(snapshot.lot_available, 3500);
        assert_eq!(snapshot.storage_available, 35000);
    }

    #[test]
    fn test_monthly_expiry_is_one_calendar_month() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let expiry = expiry_for(PlanPeriod::Monthly, now);
        assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 4, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_monthly_expiry_clamps_to_month_end() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let expiry = expiry_for(PlanPeriod::Monthly, now);
        assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_yearly_expiry_is_twelve_months() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let expiry = expiry_for(PlanPeriod::Yearly, now);
        assert_eq!(expiry, Utc.with_ymd_and_hms(2027, 3, 15, 12, 0, 0).unwrap());
    }
}
