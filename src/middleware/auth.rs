use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    auth::JwtService,
    database::queries::UserQueries,
    errors::AppError,
    handlers::AppState,
    models::UserRole,
};

/// Identity proven by a valid, unrevoked access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Auth("Authentication required".to_string()))?;

        let jwt_service = JwtService::new(
            &state.config.jwt_secret,
            state.config.access_token_ttl_minutes,
        );
        let claims = jwt_service.verify_access_token(token)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Auth("Invalid token".to_string()))?;

        let user = UserQueries::find_by_id(state.database.pool(), user_id)
            .await?
            .filter(|user| user.active)
            .ok_or_else(|| AppError::Auth("Invalid or expired token".to_string()))?;

        // Tokens minted before the last refresh or logout carry a stale
        // version and are rejected here.
        if claims.ver != user.token_version {
            return Err(AppError::Auth("Token has been revoked".to_string()));
        }

        Ok(AuthenticatedUser {
            id: user.id,
            email: user.email,
            role: user.role,
        })
    }
}
