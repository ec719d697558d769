use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Validated account fields handed to the store; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Fields that carry a uniqueness constraint, in the order they are reported
pub const UNIQUE_FIELDS: [&str; 2] = ["username", "email"];

impl NewUser {
    /// Value of a unique field by name
    pub fn unique_value(&self, field: &str) -> Option<&str> {
        match field {
            "username" => Some(&self.username),
            "email" => Some(&self.email),
            _ => None,
        }
    }
}

impl User {
    pub fn unique_value(&self, field: &str) -> Option<&str> {
        match field {
            "username" => Some(&self.username),
            "email" => Some(&self.email),
            _ => None,
        }
    }
}
