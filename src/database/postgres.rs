use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::models::{Location, NewUser, User, UserWithLocations, UNIQUE_FIELDS};
use crate::database::store::{StoreError, UserStore};

const UNIQUE_VIOLATION: &str = "23505";

/// Tables the API reads and writes. Each statement is idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT users_username_key UNIQUE (username),
        CONSTRAINT users_email_key UNIQUE (email)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS locations (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        latitude DOUBLE PRECISION NOT NULL,
        longitude DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS locations_user_id_idx ON locations (user_id)",
];

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(unavailable)?;

        info!("Connected user store pool (max {} connections)", config.max_connections);
        Ok(Self::new(pool))
    }

    /// Create the users and locations tables if they are missing
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await.map_err(unavailable)?;
        }
        info!("User store schema is in place");
        Ok(())
    }

    /// Work out which unique fields of `new_user` already belong to someone.
    /// Postgres only names the first violated constraint, so ask directly.
    async fn taken_fields(&self, new_user: &NewUser, constraint: Option<&str>) -> Vec<String> {
        let rows = sqlx::query("SELECT username, email FROM users WHERE username = $1 OR email = $2")
            .bind(&new_user.username)
            .bind(&new_user.email)
            .fetch_all(&self.pool)
            .await;

        let mut taken: Vec<String> = match rows {
            Ok(rows) => UNIQUE_FIELDS
                .iter()
                .filter(|field| {
                    let wanted = new_user.unique_value(field);
                    rows.iter().any(|row| row.try_get::<String, _>(**field).ok().as_deref() == wanted)
                })
                .map(|field| field.to_string())
                .collect(),
            Err(e) => {
                tracing::warn!("Could not enumerate conflicting fields: {}", e);
                Vec::new()
            }
        };

        // The other row may be gone already; fall back to the constraint name
        if taken.is_empty() {
            if let Some(field) = constraint.and_then(field_for_constraint) {
                taken.push(field.to_string());
            }
        }
        taken
    }
}

/// `users_email_key` -> `email`
fn field_for_constraint(constraint: &str) -> Option<&'static str> {
    UNIQUE_FIELDS
        .iter()
        .copied()
        .find(|field| constraint == format!("users_{}_key", field))
}

/// A conflict needs at least one named field; otherwise pass the database message on
fn unique_violation(taken: Vec<String>, message: &str) -> StoreError {
    if taken.is_empty() {
        StoreError::Rejected(message.to_string())
    } else {
        StoreError::Conflict(taken)
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING id, username, email, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) => {
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                    let constraint = db_err.constraint().map(str::to_string);
                    let taken = self.taken_fields(&new_user, constraint.as_deref()).await;
                    Err(unique_violation(taken, db_err.message()))
                } else {
                    Err(StoreError::Rejected(db_err.message().to_string()))
                }
            }
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let found = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        // Keep the caller's order
        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|user| user.id == *id).cloned())
            .collect())
    }

    async fn existing_ids(&self, ids: &[Uuid]) -> Result<HashSet<Uuid>, StoreError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = sqlx::query("SELECT id FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        rows.iter()
            .map(|row| row.try_get::<Uuid, _>("id").map_err(unavailable))
            .collect()
    }

    async fn find_with_locations(&self, id: Uuid) -> Result<Option<UserWithLocations>, StoreError> {
        let Some(user) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, user_id, name, latitude, longitude, created_at
             FROM locations
             WHERE user_id = $1
             ORDER BY created_at, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(Some(UserWithLocations { user, locations }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(unavailable)?;
        Ok(())
    }
}
