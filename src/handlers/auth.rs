use axum::{extract::State, response::Json};
use serde_json::json;

use crate::{
    auth::JwtService,
    database::queries::UserQueries,
    errors::{AppError, Result},
    handlers::AppState,
    middleware::AuthenticatedUser,
    models::{AuthResponse, LoginRequest, RefreshRequest, UserResponse},
    services::{session, subscription},
};

fn jwt_service(state: &AppState) -> JwtService {
    JwtService::new(
        &state.config.jwt_secret,
        state.config.access_token_ttl_minutes,
    )
}

async fn auth_response(
    state: &AppState,
    tokens: session::SessionTokens,
) -> Result<AuthResponse> {
    let active_plan =
        subscription::active_assignment_with_plan(state.database.pool(), tokens.user.id).await?;

    Ok(AuthResponse {
        user: UserResponse::from(tokens.user).with_active_plan(active_plan),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: tokens.expires_in,
    })
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    // Rejected before any lookup; failure shapes below stay uniform.
    if !request.email.contains('@') {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }
    if request.password.len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    let tokens = session::login(
        state.database.pool(),
        &jwt_service(&state),
        &request.email,
        &request.password,
    )
    .await?;

    let response = auth_response(&state, tokens).await?;

    Ok(Json(json!({ "data": response })))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>> {
    let refresh_token = request
        .refresh_token
        .as_deref()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Validation("Refresh token is required".to_string()))?;

    let tokens = session::refresh(state.database.pool(), &jwt_service(&state), refresh_token).await?;

    let response = auth_response(&state, tokens).await?;

    Ok(Json(json!({ "data": response })))
}

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    let full_user = UserQueries::find_by_id(state.database.pool(), user.id)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid or expired token".to_string()))?;

    let active_plan =
        subscription::active_assignment_with_plan(state.database.pool(), user.id).await?;

    Ok(Json(json!({
        "data": UserResponse::from(full_user).with_active_plan(active_plan)
    })))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    session::logout_everywhere(state.database.pool(), user.id).await?;

    Ok(Json(json!({
        "message": "Logged out successfully"
    })))
}

pub async fn logout_all(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    session::logout_everywhere(state.database.pool(), user.id).await?;

    Ok(Json(json!({
        "message": "Logged out of all devices successfully"
    })))
}
