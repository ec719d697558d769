use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{NewUser, User, UserWithLocations};

/// Errors surfaced by a user store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// One or more unique fields already belong to another user
    #[error("Uniqueness conflict on: {}", .0.join(", "))]
    Conflict(Vec<String>),

    /// The store refused the write for a reason other than uniqueness
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// The store could not be reached or failed unexpectedly
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam for users and their locations.
///
/// Implementations own identifier generation and enforce the uniqueness of
/// `username` and `email`: concurrent creates race on the store, the first
/// writer wins and the rest see [`StoreError::Conflict`].
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user, generating its identifier
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Users for the given ids; ids with no user are simply absent
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    /// Which of the given ids name an existing user
    async fn existing_ids(&self, ids: &[Uuid]) -> Result<HashSet<Uuid>, StoreError>;

    /// A user with its related locations, or None if the user is gone
    async fn find_with_locations(&self, id: Uuid) -> Result<Option<UserWithLocations>, StoreError>;

    /// Cheap round trip used by the health endpoint
    async fn health_check(&self) -> Result<(), StoreError>;
}
