use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::server::AppState;

/// GET /health - liveness plus a store round trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::config::AppConfig;
    use crate::database::models::{NewUser, User, UserWithLocations};
    use crate::database::{MemoryUserStore, StoreError, UserStore};

    const SECRET_DETAIL: &str = "connection refused (postgres://admin:hunter2@db:5432)";

    /// A store whose backend is down
    struct DownStore;

    #[async_trait]
    impl UserStore for DownStore {
        async fn create(&self, _new_user: NewUser) -> Result<User, StoreError> {
            Err(StoreError::Unavailable(SECRET_DETAIL.into()))
        }
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, StoreError> {
            Err(StoreError::Unavailable(SECRET_DETAIL.into()))
        }
        async fn find_by_ids(&self, _ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
            Err(StoreError::Unavailable(SECRET_DETAIL.into()))
        }
        async fn existing_ids(&self, _ids: &[Uuid]) -> Result<HashSet<Uuid>, StoreError> {
            Err(StoreError::Unavailable(SECRET_DETAIL.into()))
        }
        async fn find_with_locations(&self, _id: Uuid) -> Result<Option<UserWithLocations>, StoreError> {
            Err(StoreError::Unavailable(SECRET_DETAIL.into()))
        }
        async fn health_check(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable(SECRET_DETAIL.into()))
        }
    }

    async fn check_health(store: Arc<dyn UserStore>) -> (StatusCode, String) {
        let state = AppState::new(AppConfig::development(), store).unwrap();
        let response = health(State(state)).await.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn healthy_store_is_ok() {
        let (status, body) = check_health(Arc::new(MemoryUserStore::new())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn degraded_store_does_not_leak_details() {
        let (status, body) = check_health(Arc::new(DownStore)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("degraded"));
        assert!(!body.contains("hunter2"));
        assert!(!body.contains("postgres://"));
    }
}
