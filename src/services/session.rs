use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{generate_refresh_token, hash_refresh_token, JwtService, PasswordService};
use crate::database::queries::{CredentialQueries, SessionQueries, UserQueries};
use crate::errors::{AppError, Result};
use crate::models::User;

// One message for every credential failure mode, so a caller cannot tell
// an unknown email from a wrong password.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub struct SessionTokens {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

pub async fn login(
    pool: &PgPool,
    jwt: &JwtService,
    email: &str,
    password: &str,
) -> Result<SessionTokens> {
    let user = UserQueries::find_active_by_email(pool, email)
        .await?
        .ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

    let credential = CredentialQueries::find_by_user(pool, user.id)
        .await?
        .ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

    if !PasswordService::verify_password(password, &credential.password_hash)? {
        return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    let access_token = jwt.issue_access_token(&user)?;
    let refresh_token = generate_refresh_token();
    SessionQueries::create(pool, user.id, &hash_refresh_token(&refresh_token)).await?;

    tracing::info!(user_id = %user.id, "session opened");

    Ok(SessionTokens {
        expires_in: jwt.expires_in_seconds(),
        user,
        access_token,
        refresh_token,
    })
}

/// Rotates the presented refresh token and reissues the access token.
///
/// The session row is locked for the duration of the transaction and its
/// digest overwritten in place, so the old refresh token is permanently
/// dead the moment this commits. Bumping the user's token version revokes
/// every access token issued before this call.
pub async fn refresh(pool: &PgPool, jwt: &JwtService, presented: &str) -> Result<SessionTokens> {
    let mut tx = pool.begin().await?;

    let session = SessionQueries::lock_by_token_hash(&mut *tx, &hash_refresh_token(presented))
        .await?
        .ok_or_else(|| AppError::Auth("Invalid refresh token".to_string()))?;

    UserQueries::find_by_id(&mut *tx, session.user_id)
        .await?
        .filter(|user| user.active)
        .ok_or_else(|| AppError::Auth("Inactive user".to_string()))?;

    let user = UserQueries::bump_token_version(&mut *tx, session.user_id).await?;

    let refresh_token = generate_refresh_token();
    SessionQueries::rotate_token_hash(&mut *tx, session.id, &hash_refresh_token(&refresh_token))
        .await?;

    tx.commit().await?;

    let access_token = jwt.issue_access_token(&user)?;

    tracing::info!(user_id = %user.id, "session rotated");

    Ok(SessionTokens {
        expires_in: jwt.expires_in_seconds(),
        user,
        access_token,
        refresh_token,
    })
}

/// Revokes every access token and deletes every session for the user.
/// Both logout routes funnel here.
pub async fn logout_everywhere(pool: &PgPool, user_id: Uuid) -> Result<u64> {
    let mut tx = pool.begin().await?;

    UserQueries::bump_token_version(&mut *tx, user_id).await?;
    let removed = SessionQueries::delete_all_for_user(&mut *tx, user_id).await?;

    tx.commit().await?;

    tracing::info!(user_id = %user_id, sessions = removed, "logged out everywhere");

    Ok(removed)
}
