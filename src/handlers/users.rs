use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    database::queries::{AssignmentQueries, PlanQueries, UserQueries},
    errors::{AppError, Result},
    handlers::AppState,
    middleware::AuthenticatedUser,
    models::{AssignmentResponse, UserResponse},
    services::subscription,
};

pub async fn show(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let user = UserQueries::find_by_id(state.database.pool(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let active_plan =
        subscription::active_assignment_with_plan(state.database.pool(), user.id).await?;

    Ok(Json(
        json!(UserResponse::from(user).with_active_plan(active_plan)),
    ))
}

/// Full assignment history, newest first, with each plan attached.
pub async fn history(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let assignments = AssignmentQueries::history_for_user(state.database.pool(), id).await?;

    if assignments.is_empty() && !UserQueries::exists(state.database.pool(), id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let plan_ids: Vec<Uuid> = assignments.iter().map(|a| a.plan_id).collect();
    let plans = PlanQueries::find_by_ids(state.database.pool(), &plan_ids).await?;

    let data: Vec<AssignmentResponse> = assignments
        .into_iter()
        .map(|assignment| {
            let plan = plans.iter().find(|p| p.id == assignment.plan_id).cloned();
            AssignmentResponse::new(assignment, plan, None)
        })
        .collect();

    Ok(Json(json!({
        "data": data,
        "total": data.len()
    })))
}
