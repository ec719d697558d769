use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// A finished, successful reply produced by a rendering stage
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    /// Create a reply with a custom status code
    pub fn with_status<T: Serialize>(data: T, status: StatusCode) -> Result<Self, ApiError> {
        let body = serde_json::to_value(&data)
            .map_err(|e| ApiError::internal(format!("Failed to serialize response data: {}", e)))?;
        Ok(Self { status, body })
    }

    /// Create a 200 OK reply
    pub fn ok<T: Serialize>(data: T) -> Result<Self, ApiError> {
        Self::with_status(data, StatusCode::OK)
    }

    /// Create a 201 Created reply
    pub fn created<T: Serialize>(data: T) -> Result<Self, ApiError> {
        Self::with_status(data, StatusCode::CREATED)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// The single place pipeline outcomes become HTTP responses
pub fn respond(outcome: Result<Reply, ApiError>) -> Response {
    match outcome {
        Ok(reply) => reply.into_response(),
        Err(error) => error.into_response(),
    }
}
