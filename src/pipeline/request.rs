use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::Method;

use crate::auth::SessionState;

/// The immutable view of an HTTP request that stages work from
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub method: Method,
    /// Path relative to the route table's prefix, always starting with '/'
    pub path: String,
    /// Values captured by `:name` segments of the matched pattern
    pub params: HashMap<String, String>,
    pub session: SessionState,
    pub body: Bytes,
}

impl PipelineRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: HashMap::new(),
            session: SessionState::Anonymous,
            body: Bytes::new(),
        }
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_session(mut self, session: SessionState) -> Self {
        self.session = session;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
