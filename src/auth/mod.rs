use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

/// Access level that may read any user's resources
pub const ROOT_ACCESS: &str = "root";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub access: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, access: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            access: access.into(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// The authenticated caller, as established from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub access: String,
}

impl Caller {
    /// Privileged callers pass every ownership check
    pub fn is_privileged(&self) -> bool {
        self.access == ROOT_ACCESS
    }
}

/// Session state resolved from the request's credentials before routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No credentials were presented
    Anonymous,
    Authenticated(Caller),
    /// Credentials were presented but did not verify
    Invalid(String),
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            access: claims.access,
        }
    }
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Validate JWT token and extract claims
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

/// Mint a bearer token for a user with the given access level
pub fn issue_token(user_id: Uuid, access: &str, security: &SecurityConfig) -> Result<String, AuthError> {
    let claims = Claims::new(user_id, access, security.jwt_expiry_hours);
    generate_jwt(&claims, security)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn token_round_trips_to_caller() {
        let security = AppConfig::development().security;
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, "user", &security).unwrap();

        let caller = Caller::from(validate_jwt(&token, &security).unwrap());
        assert_eq!(caller.user_id, user_id);
        assert!(!caller.is_privileged());
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let security = AppConfig::development().security;
        let mut other = security.clone();
        other.jwt_secret = "someone-else".to_string();

        let token = issue_token(Uuid::new_v4(), ROOT_ACCESS, &other).unwrap();
        assert!(matches!(validate_jwt(&token, &security), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let security = AppConfig::development().security;
        let mut claims = Claims::new(Uuid::new_v4(), "user", 1);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;

        let token = generate_jwt(&claims, &security).unwrap();
        assert!(validate_jwt(&token, &security).is_err());
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let mut security = AppConfig::development().security;
        security.jwt_secret.clear();
        assert_eq!(issue_token(Uuid::new_v4(), "user", &security), Err(AuthError::InvalidSecret));
    }
}
