// Router assembly: the health probe plus the users route table behind one dispatcher
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::SessionState;
use crate::config::AppConfig;
use crate::database::UserStore;
use crate::error::ApiError;
use crate::handlers::{self, user_routes};
use crate::middleware::{resolve_session, respond};
use crate::pipeline::{PipelineError, PipelineRequest, RouteLookup, RouteTable};

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn UserStore>,
    pub routes: Arc<RouteTable>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn UserStore>) -> Result<Self, PipelineError> {
        let routes = user_routes(store.clone(), &config.security)?;
        Ok(Self {
            config: Arc::new(config),
            store,
            routes: Arc::new(routes),
        })
    }
}

pub fn app(state: AppState) -> Router {
    let prefix = state.routes.prefix().to_string();

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route(&prefix, any(dispatch))
        .route(&format!("{}/", prefix), any(dispatch))
        .route(&format!("{}/*rest", prefix), any(dispatch))
        .layer(from_fn_with_state(state.clone(), resolve_session));

    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state.config));
    }
    if state.config.server.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Hand a request under the users prefix to its pipeline and render the outcome
async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let Some(path) = state.routes.strip_prefix(parts.uri.path()) else {
        return ApiError::not_found("Route not found").into_response();
    };

    let (pipeline, params) = match state.routes.lookup(&parts.method, path) {
        RouteLookup::Found { pipeline, params } => (pipeline, params),
        RouteLookup::MethodNotAllowed(allowed) => {
            let allowed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
            return ApiError::method_not_allowed(format!("Allowed methods: {}", allowed.join(", "))).into_response();
        }
        RouteLookup::NotFound => return ApiError::not_found("Route not found").into_response(),
    };

    let body = match axum::body::to_bytes(body, state.config.server.max_request_size_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => return ApiError::bad_request(format!("Could not read request body: {}", e)).into_response(),
    };

    let session = parts
        .extensions
        .get::<SessionState>()
        .cloned()
        .unwrap_or(SessionState::Anonymous);

    let request = PipelineRequest::new(parts.method, path)
        .with_params(params)
        .with_session(session)
        .with_body(body);

    let outcome = pipeline.execute(&request).await;
    match &outcome {
        Ok(reply) => tracing::info!("{} {} -> {}", request.method, parts.uri.path(), reply.status),
        Err(error) => tracing::info!("{} {} -> {}", request.method, parts.uri.path(), error.status_code()),
    }
    respond(outcome)
}
