use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// One refresh-token session per device. Only the SHA-256 digest of the
/// refresh token is stored; the plaintext goes to the client exactly once.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
