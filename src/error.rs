// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::BTreeMap;

/// Field name to message, rendered as the `errors` member of an error body
pub type FieldErrors = BTreeMap<String, String>;

/// Every way a request can be rejected. Stages return these; only the
/// pipeline responder turns them into HTTP responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    // 400 Bad Request
    InvalidInput {
        message: String,
        errors: FieldErrors,
    },
    BadRequest(String),
    InvalidIdentifier(String),

    // 401 Unauthorized
    Unauthenticated(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 405 Method Not Allowed
    MethodNotAllowed(String),

    // 409 Conflict
    Conflict(FieldErrors),

    // 500 Internal Server Error
    Internal(String),
}

/// Wire shape of an error: `{ status, message?, errors? }`
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<&'a FieldErrors>,
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe message, if the error carries one
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::InvalidInput { message, .. } => Some(message),
            ApiError::BadRequest(msg)
            | ApiError::InvalidIdentifier(msg)
            | ApiError::Unauthenticated(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::MethodNotAllowed(msg) => Some(msg),
            ApiError::Conflict(_) => None,
            // Details are logged by the responder, never sent
            ApiError::Internal(_) => Some("Internal server error"),
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::InvalidInput { errors, .. } | ApiError::Conflict(errors) => Some(errors),
            _ => None,
        }
    }

    /// Short kind name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput { .. } => "InvalidInput",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::InvalidIdentifier(_) => "InvalidIdentifier",
            ApiError::Unauthenticated(_) => "Unauthenticated",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::NotFound(_) => "NotFound",
            ApiError::MethodNotAllowed(_) => "MethodNotAllowed",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Internal(_) => "Internal",
        }
    }

    pub fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            status: self.status_code().as_u16(),
            message: self.message(),
            errors: self.field_errors(),
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn invalid_input(message: impl Into<String>, errors: FieldErrors) -> Self {
        ApiError::InvalidInput {
            message: message.into(),
            errors,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        ApiError::InvalidIdentifier(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        ApiError::MethodNotAllowed(message.into())
    }

    /// One "This <field> is taken." entry per colliding field
    pub fn conflict<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let errors = fields
            .into_iter()
            .map(|field| {
                let field = field.into();
                let message = format!("This {} is taken.", field);
                (field, message)
            })
            .collect();
        ApiError::Conflict(errors)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<crate::database::StoreError> for ApiError {
    fn from(err: crate::database::StoreError) -> Self {
        match err {
            crate::database::StoreError::Conflict(fields) => ApiError::conflict(fields),
            crate::database::StoreError::Rejected(msg) => ApiError::bad_request(msg),
            crate::database::StoreError::Unavailable(msg) => {
                // Don't expose connection details to clients
                tracing::error!("Store unavailable: {}", msg);
                ApiError::internal(msg)
            }
        }
    }
}

impl From<crate::pipeline::PipelineError> for ApiError {
    fn from(err: crate::pipeline::PipelineError) -> Self {
        ApiError::internal(err.to_string())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Internal(detail) => write!(f, "{}: {}", self.kind(), detail),
            _ => write!(f, "{}: {}", self.kind(), self.message().unwrap_or("")),
        }
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!("Internal error: {}", detail);
        }
        (self.status_code(), Json(self.body())).into_response()
    }
}
