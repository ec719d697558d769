#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use waypost::auth::{issue_token, ROOT_ACCESS};
use waypost::config::AppConfig;
use waypost::database::MemoryUserStore;
use waypost::server::{app, AppState};

/// An in-process app backed by the in-memory store
pub struct TestApp {
    pub config: AppConfig,
    pub store: Arc<MemoryUserStore>,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.bytes).context("response body is not JSON")
    }
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let mut config = AppConfig::development();
        config.server.enable_request_logging = false;

        let store = Arc::new(MemoryUserStore::new());
        let state = AppState::new(config.clone(), store.clone())?;

        Ok(Self {
            config,
            store,
            router: app(state),
        })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(TestResponse {
            status,
            bytes: bytes.to_vec(),
        })
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty())?).await
    }

    pub async fn post_json(&self, uri: &str, body: &str) -> Result<TestResponse> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?;
        self.send(request).await
    }

    /// Create a user through the API and return its id
    pub async fn create_user(&self, username: &str) -> Result<Uuid> {
        let body = serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "correct-horse",
            "passwordConfirmation": "correct-horse",
        });
        let res = self.post_json("/api/users", &body.to_string()).await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create failed: {}", res.status);

        let id = res.json()?["id"].as_str().context("id missing")?.parse()?;
        Ok(id)
    }

    pub fn token_for(&self, user_id: Uuid) -> Result<String> {
        Ok(issue_token(user_id, "user", &self.config.security)?)
    }

    pub fn root_token(&self) -> Result<String> {
        Ok(issue_token(Uuid::new_v4(), ROOT_ACCESS, &self.config.security)?)
    }
}

pub fn user_input(username: &str, email: &str, password: &str, confirmation: &str) -> String {
    serde_json::json!({
        "username": username,
        "email": email,
        "password": password,
        "passwordConfirmation": confirmation,
    })
    .to_string()
}
