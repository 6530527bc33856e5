use sqlx::PgExecutor;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::*;

const USER_COLUMNS: &str =
    "id, name, avatar, email, role, active, token_version, created_at, updated_at";

const PLAN_COLUMNS: &str = "id, base_plan_id, label, price, period, discount_percent, \
     storage_quota, lot_quota, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "id, user_id, plan_id, expires_at, lot_available, \
     storage_available, active, exchange_kind, created_at, updated_at";

pub struct UserQueries;

impl UserQueries {
    pub async fn create(
        executor: impl PgExecutor<'_>,
        name: &str,
        email: &str,
        role: UserRole,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(role)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(executor: impl PgExecutor<'_>, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    pub async fn find_active_by_email(
        executor: impl PgExecutor<'_>,
        email: &str,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND active"
        ))
        .bind(email)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    pub async fn exists(executor: impl PgExecutor<'_>, id: Uuid) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(id)
                .fetch_one(executor)
                .await?;

        Ok(exists)
    }

    /// Invalidates every outstanding access token for the user: tokens
    /// carry the version they were minted with and die on mismatch.
    pub async fn bump_token_version(executor: impl PgExecutor<'_>, id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET token_version = token_version + 1, updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }
}

pub struct CredentialQueries;

impl CredentialQueries {
    pub async fn create(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<Credential> {
        let credential = sqlx::query_as::<_, Credential>(
            "INSERT INTO user_credentials (user_id, password_hash) VALUES ($1, $2) \
             RETURNING user_id, password_hash, created_at, updated_at",
        )
        .bind(user_id)
        .bind(password_hash)
        .fetch_one(executor)
        .await?;

        Ok(credential)
    }

    pub async fn find_by_user(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<Option<Credential>> {
        let credential = sqlx::query_as::<_, Credential>(
            "SELECT user_id, password_hash, created_at, updated_at \
             FROM user_credentials WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(credential)
    }
}

pub struct SessionQueries;

impl SessionQueries {
    pub async fn create(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO user_sessions (user_id, token_hash) VALUES ($1, $2) \
             RETURNING id, user_id, token_hash, created_at, updated_at",
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_one(executor)
        .await?;

        Ok(session)
    }

    /// Locks the session row until the surrounding transaction ends, so two
    /// concurrent refresh calls cannot both rotate off the same token.
    pub async fn lock_by_token_hash(
        executor: impl PgExecutor<'_>,
        token_hash: &str,
    ) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, token_hash, created_at, updated_at \
             FROM user_sessions WHERE token_hash = $1 FOR UPDATE",
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await?;

        Ok(session)
    }

    /// Rotation reuses the session row; the previous digest is gone for good.
    pub async fn rotate_token_hash(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        token_hash: &str,
    ) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            "UPDATE user_sessions SET token_hash = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING id, user_id, token_hash, created_at, updated_at",
        )
        .bind(id)
        .bind(token_hash)
        .fetch_one(executor)
        .await?;

        Ok(session)
    }

    pub async fn delete_all_for_user(executor: impl PgExecutor<'_>, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_for_user(executor: impl PgExecutor<'_>, user_id: Uuid) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM user_sessions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(executor)
                .await?;

        Ok(count)
    }
}

pub struct PlanQueries;

impl PlanQueries {
    /// Catalog writes live outside this service; this exists for the test
    /// suites to stock a catalog to exercise the exchange paths against.
    pub async fn create(executor: impl PgExecutor<'_>, plan: &NewPlan) -> Result<Plan> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            "INSERT INTO plans (base_plan_id, label, price, period, discount_percent, \
             storage_quota, lot_quota) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {PLAN_COLUMNS}"
        ))
        .bind(plan.base_plan_id)
        .bind(&plan.label)
        .bind(plan.price)
        .bind(plan.period)
        .bind(plan.discount_percent)
        .bind(plan.storage_quota)
        .bind(plan.lot_quota)
        .fetch_one(executor)
        .await?;

        Ok(plan)
    }

    pub async fn list_all(executor: impl PgExecutor<'_>) -> Result<Vec<Plan>> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans ORDER BY created_at, id"
        ))
        .fetch_all(executor)
        .await?;

        Ok(plans)
    }

    pub async fn find_by_id(executor: impl PgExecutor<'_>, id: Uuid) -> Result<Option<Plan>> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(plan)
    }

    pub async fn find_by_ids(executor: impl PgExecutor<'_>, ids: &[Uuid]) -> Result<Vec<Plan>> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(executor)
        .await?;

        Ok(plans)
    }
}

pub struct AssignmentQueries;

impl AssignmentQueries {
    pub async fn find_active_for_user(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<Option<PlanAssignment>> {
        let assignment = sqlx::query_as::<_, PlanAssignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM plan_assignments WHERE user_id = $1 AND active"
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(assignment)
    }

    /// `FOR UPDATE` variant for the exchange transaction: holds the active
    /// row against concurrent exchanges until commit.
    pub async fn lock_active_for_user(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<Option<PlanAssignment>> {
        let assignment = sqlx::query_as::<_, PlanAssignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM plan_assignments \
             WHERE user_id = $1 AND active FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(assignment)
    }

    pub async fn deactivate_for_user(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE plan_assignments SET active = FALSE, updated_at = NOW() \
             WHERE user_id = $1 AND active",
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn insert(
        executor: impl PgExecutor<'_>,
        assignment: &NewAssignment,
    ) -> Result<PlanAssignment> {
        let assignment = sqlx::query_as::<_, PlanAssignment>(&format!(
            "INSERT INTO plan_assignments \
             (user_id, plan_id, expires_at, lot_available, storage_available, exchange_kind) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ASSIGNMENT_COLUMNS}"
        ))
        .bind(assignment.user_id)
        .bind(assignment.plan_id)
        .bind(assignment.expires_at)
        .bind(assignment.benefits.lot_available)
        .bind(assignment.benefits.storage_available)
        .bind(assignment.exchange_kind)
        .fetch_one(executor)
        .await?;

        Ok(assignment)
    }

    pub async fn history_for_user(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<Vec<PlanAssignment>> {
        let assignments = sqlx::query_as::<_, PlanAssignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM plan_assignments \
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(assignments)
    }
}

pub struct UsageQueries;

impl UsageQueries {
    /// Zeroed counters for a freshly created assignment.
    pub async fn init(executor: impl PgExecutor<'_>, assignment_id: Uuid) -> Result<PlanUsage> {
        let usage = sqlx::query_as::<_, PlanUsage>(
            "INSERT INTO plan_usages (assignment_id) VALUES ($1) \
             RETURNING id, assignment_id, lot_used, storage_used, created_at, updated_at",
        )
        .bind(assignment_id)
        .fetch_one(executor)
        .await?;

        Ok(usage)
    }

    pub async fn find_by_assignment(
        executor: impl PgExecutor<'_>,
        assignment_id: Uuid,
    ) -> Result<Option<PlanUsage>> {
        let usage = sqlx::query_as::<_, PlanUsage>(
            "SELECT id, assignment_id, lot_used, storage_used, created_at, updated_at \
             FROM plan_usages WHERE assignment_id = $1",
        )
        .bind(assignment_id)
        .fetch_optional(executor)
        .await?;

        Ok(usage)
    }

    pub async fn totals_for_assignment(
        executor: impl PgExecutor<'_>,
        assignment_id: Uuid,
    ) -> Result<UsageTotals> {
        let totals = Self::find_by_assignment(executor, assignment_id)
            .await?
            .map(|usage| UsageTotals::from(&usage))
            .unwrap_or_default();

        Ok(totals)
    }
}
