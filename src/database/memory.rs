use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{Location, NewUser, User, UserWithLocations, UNIQUE_FIELDS};
use crate::database::store::{StoreError, UserStore};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    locations: Vec<Location>,
}

/// Process-local store for tests and local development.
///
/// The uniqueness check and the insert happen under a single write lock, so
/// concurrent creates behave like the database's unique constraints.
#[derive(Default)]
pub struct MemoryUserStore {
    state: RwLock<MemoryState>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a location for an existing user
    pub async fn add_location(
        &self,
        user_id: Uuid,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Location, StoreError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::Rejected(format!("No user {} to own the location", user_id)));
        }

        let location = Location {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            latitude,
            longitude,
            created_at: Utc::now(),
        };
        state.locations.push(location.clone());
        Ok(location)
    }

    /// Drop a user and its locations. Only used to exercise races in tests.
    pub async fn remove_user(&self, id: Uuid) -> bool {
        let mut state = self.state.write().await;
        state.locations.retain(|location| location.user_id != id);
        state.users.remove(&id).is_some()
    }

    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        let taken: Vec<String> = UNIQUE_FIELDS
            .iter()
            .filter(|field| {
                let wanted = new_user.unique_value(field);
                state.users.values().any(|user| user.unique_value(field) == wanted)
            })
            .map(|field| field.to_string())
            .collect();

        if !taken.is_empty() {
            return Err(StoreError::Conflict(taken));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());

        tracing::debug!("Stored user {} in memory", user.id);
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn existing_ids(&self, ids: &[Uuid]) -> Result<HashSet<Uuid>, StoreError> {
        let state = self.state.read().await;
        Ok(ids.iter().copied().filter(|id| state.users.contains_key(id)).collect())
    }

    async fn find_with_locations(&self, id: Uuid) -> Result<Option<UserWithLocations>, StoreError> {
        let state = self.state.read().await;
        let Some(user) = state.users.get(&id).cloned() else {
            return Ok(None);
        };

        let locations = state
            .locations
            .iter()
            .filter(|location| location.user_id == id)
            .cloned()
            .collect();

        Ok(Some(UserWithLocations { user, locations }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn create_reports_every_taken_field() {
        let store = MemoryUserStore::new();
        store.create(new_user("ada", "ada@example.com")).await.unwrap();

        let err = store.create(new_user("ada", "ada@example.com")).await.unwrap_err();
        assert_eq!(err, StoreError::Conflict(vec!["username".into(), "email".into()]));

        let err = store.create(new_user("grace", "ada@example.com")).await.unwrap_err();
        assert_eq!(err, StoreError::Conflict(vec!["email".into()]));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_creates_have_one_winner() {
        let store = std::sync::Arc::new(MemoryUserStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(new_user("ada", "ada@example.com")).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn locations_follow_their_owner() {
        let store = MemoryUserStore::new();
        let ada = store.create(new_user("ada", "ada@example.com")).await.unwrap();
        let grace = store.create(new_user("grace", "grace@example.com")).await.unwrap();
        store.add_location(ada.id, "Home", 51.5, -0.12).await.unwrap();
        store.add_location(grace.id, "Office", 40.7, -74.0).await.unwrap();

        let found = store.find_with_locations(ada.id).await.unwrap().unwrap();
        assert_eq!(found.locations.len(), 1);
        assert_eq!(found.locations[0].name, "Home");

        assert!(store.remove_user(ada.id).await);
        assert!(store.find_with_locations(ada.id).await.unwrap().is_none());
        assert!(store.add_location(ada.id, "Gone", 0.0, 0.0).await.is_err());
    }

    #[tokio::test]
    async fn existing_ids_ignores_unknown() {
        let store = MemoryUserStore::new();
        let ada = store.create(new_user("ada", "ada@example.com")).await.unwrap();
        let unknown = Uuid::new_v4();

        let found = store.existing_ids(&[ada.id, unknown]).await.unwrap();
        assert!(found.contains(&ada.id));
        assert!(!found.contains(&unknown));
    }
}
