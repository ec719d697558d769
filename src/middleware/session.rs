use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Caller, SessionState};
use crate::server::AppState;

/// Resolves the caller's session from the Authorization header and attaches
/// it to the request. Never rejects: deciding whether a route needs a session
/// is the pipeline's job.
pub async fn resolve_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let session = session_from_headers(request.headers(), &state);
    request.extensions_mut().insert(session);
    next.run(request).await
}

pub fn session_from_headers(headers: &HeaderMap, state: &AppState) -> SessionState {
    let token = match extract_bearer_token(headers) {
        Ok(Some(token)) => token,
        Ok(None) => return SessionState::Anonymous,
        Err(reason) => return SessionState::Invalid(reason),
    };

    match validate_jwt(&token, &state.config.security) {
        Ok(claims) => SessionState::Authenticated(Caller::from(claims)),
        Err(e) => {
            tracing::debug!("Rejected bearer token: {}", e);
            SessionState::Invalid(e.to_string())
        }
    }
}

/// Extract the bearer token, if any. Malformed headers are an error.
fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        Some(_) => Err("Empty JWT token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def")), Ok(Some("abc.def".to_string())));
    }

    #[test]
    fn other_schemes_are_invalid() {
        assert!(extract_bearer_token(&headers("Basic dXNlcg==")).is_err());
        assert!(extract_bearer_token(&headers("Bearer   ")).is_err());
    }
}
