use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, Result};
use crate::models::{User, UserRole};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub role: UserRole,
    /// Token version at mint time; a bump on the user row kills the token.
    pub ver: i32,
    pub exp: i64,
    pub iat: i64,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, access_token_ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            access_token_ttl: Duration::minutes(access_token_ttl_minutes),
        }
    }

    pub fn expires_in_seconds(&self) -> i64 {
        self.access_token_ttl.num_seconds()
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            ver: user.token_version,
            exp: (now + self.access_token_ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign access token: {}", e)))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AppError::Auth("Invalid or expired token".to_string()))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_user(token_version: i32) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            avatar: None,
            email: "test@example.com".to_string(),
            role: UserRole::Standard,
            active: true,
            token_version,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let jwt_service = JwtService::new("test-secret", 60);
        let user = test_user(3);

        let token = jwt_service.issue_access_token(&user).unwrap();
        let claims = jwt_service.verify_access_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.ver, 3);
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt_service = JwtService::new("test-secret", -5);
        let user = test_user(0);

        let token = jwt_service.issue_access_token(&user).unwrap();
        assert!(jwt_service.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let user = test_user(0);
        let token = JwtService::new("secret-a", 60)
            .issue_access_token(&user)
            .unwrap();

        assert!(JwtService::new("secret-b", 60)
            .verify_access_token(&token)
            .is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let jwt_service = JwtService::new("test-secret", 60);
        assert!(jwt_service.verify_access_token("not-a-jwt").is_err());
    }
}
