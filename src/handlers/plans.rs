use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::{
    database::queries::PlanQueries,
    errors::{AppError, Result},
    handlers::AppState,
    middleware::AuthenticatedUser,
    models::ContractPlanRequest,
    services::subscription,
};

pub async fn list(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let plans = PlanQueries::list_all(state.database.pool()).await?;

    Ok(Json(json!({
        "data": plans,
        "total": plans.len()
    })))
}

pub async fn contract(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ContractPlanRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let plan_reference = request
        .plan_reference
        .ok_or_else(|| AppError::Validation("Plan reference is required".to_string()))?;
    let exchange_type = request
        .exchange_type
        .ok_or_else(|| AppError::Validation("Exchange type is required".to_string()))?;

    let assignment =
        subscription::contract_or_change(state.database.pool(), user.id, plan_reference, exchange_type)
            .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Plan contracted successfully",
            "data": assignment
        })),
    ))
}
