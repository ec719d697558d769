// handlers/users.rs - the /api/users routes
//
//   POST /                     validate -> persist -> 201 { id }
//   GET  /id/:userId           ids -> validate ids -> fetch -> assign -> render
//   GET  /id/:userId/locations auth -> ids -> validate ids -> check -> access -> locations

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use serde_json::{json, Value};

use crate::config::SecurityConfig;
use crate::database::models::NewUser;
use crate::database::{StoreError, UserStore};
use crate::error::{ApiError, FieldErrors};
use crate::middleware::response::Reply;
use crate::pipeline::{
    DocumentKey, Phase, Pipeline, PipelineError, PipelineRequest, RequestContext, RouteTable, Stage, Step,
};
use crate::stages::{
    AssignSingleDocument, CheckAccessForUserIds, CheckUsers, FetchUsers, IdValidator, IsAuthenticated,
    RenderResult, SetIds,
};
use crate::validation::{validate_user_input, UserInput};

pub const USERS_PREFIX: &str = "/api/users";
pub const USER_ID_PARAM: &str = "userId";

const USERS: DocumentKey = DocumentKey::new("users");
const USER: DocumentKey = DocumentKey::new("user");

pub const LOCATIONS_AUTH_REASON: &str = "Authentication required to view locations";
pub const LOCATIONS_ACCESS_REASON: &str = "You may not view another user's locations";

/// Build the route table for the users resource
pub fn user_routes(store: Arc<dyn UserStore>, security: &SecurityConfig) -> Result<RouteTable, PipelineError> {
    let create_user = Pipeline::builder("create_user")
        .stage(ValidateUserInput)
        .stage(PersistUser::new(store.clone(), security.bcrypt_cost))
        .stage(RenderCreated)
        .build()?;

    let get_user = Pipeline::builder("get_user")
        .stage(SetIds::from_param(USER_ID_PARAM))
        .stage(IdValidator)
        .stage(FetchUsers::new(store.clone(), USERS))
        .stage(AssignSingleDocument::new(USERS, USER))
        .stage(RenderResult::new(USER))
        .build()?;

    let get_user_locations = Pipeline::builder("get_user_locations")
        .stage(IsAuthenticated::new(LOCATIONS_AUTH_REASON))
        .stage(SetIds::from_param(USER_ID_PARAM))
        .stage(IdValidator)
        .stage(CheckUsers::new(store.clone()))
        .stage(CheckAccessForUserIds::new(LOCATIONS_ACCESS_REASON))
        .stage(RenderLocations::new(store))
        .build()?;

    Ok(RouteTable::new(USERS_PREFIX)
        .route(Method::POST, "/", create_user)
        .route(Method::GET, "/id/:userId", get_user)
        .route(Method::GET, "/id/:userId/locations", get_user_locations))
}

/// Runs the account validation predicate over the request body
pub struct ValidateUserInput;

impl ValidateUserInput {
    fn parse(request: &PipelineRequest) -> Result<UserInput, ApiError> {
        let value: Value = if request.body.is_empty() {
            json!({})
        } else {
            serde_json::from_slice(&request.body)
                .map_err(|e| ApiError::bad_request(format!("Malformed JSON body: {}", e)))?
        };

        if !value.is_object() {
            let errors = FieldErrors::from([("body".to_string(), "Expected a JSON object".to_string())]);
            return Err(ApiError::invalid_input("Invalid user data", errors));
        }

        serde_json::from_value(value).map_err(|e| {
            let errors = FieldErrors::from([("body".to_string(), e.to_string())]);
            ApiError::invalid_input("Invalid user data", errors)
        })
    }
}

#[async_trait]
impl Stage for ValidateUserInput {
    fn name(&self) -> &'static str {
        "validate_user_input"
    }

    fn phase(&self) -> Phase {
        Phase::Validated
    }

    async fn run(&self, request: &PipelineRequest, mut ctx: RequestContext) -> Result<Step, ApiError> {
        let input = Self::parse(request)?;

        let outcome = validate_user_input(&input);
        if !outcome.is_valid {
            return Err(ApiError::invalid_input("Invalid user data", outcome.errors));
        }

        ctx.input = Some(input);
        Ok(Step::Next(ctx))
    }
}

/// Hashes the password and writes the user; uniqueness violations become 409
pub struct PersistUser {
    store: Arc<dyn UserStore>,
    bcrypt_cost: u32,
}

impl PersistUser {
    pub fn new(store: Arc<dyn UserStore>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }
}

#[async_trait]
impl Stage for PersistUser {
    fn name(&self) -> &'static str {
        "persist_user"
    }

    fn phase(&self) -> Phase {
        Phase::Stored
    }

    async fn run(&self, _request: &PipelineRequest, mut ctx: RequestContext) -> Result<Step, ApiError> {
        let input = ctx
            .input
            .take()
            .ok_or_else(|| ApiError::internal("persist_user ran without validated input"))?;

        // bcrypt is deliberately slow; keep it off the async workers
        let cost = self.bcrypt_cost;
        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| ApiError::internal(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

        let new_user = NewUser {
            username: input.username,
            email: input.email,
            password_hash,
        };

        let user = self.store.create(new_user).await.map_err(|err| match err {
            StoreError::Conflict(fields) => ApiError::conflict(fields),
            StoreError::Rejected(msg) => ApiError::bad_request(msg),
            StoreError::Unavailable(msg) => {
                tracing::error!("User store failed during create: {}", msg);
                ApiError::bad_request(msg)
            }
        })?;

        tracing::info!("Created user {} ({})", user.id, user.username);
        ctx.created = Some(user);
        Ok(Step::Next(ctx))
    }
}

/// 201 with the new user's identifier
pub struct RenderCreated;

#[async_trait]
impl Stage for RenderCreated {
    fn name(&self) -> &'static str {
        "render_created"
    }

    fn phase(&self) -> Phase {
        Phase::Rendered
    }

    async fn run(&self, _request: &PipelineRequest, ctx: RequestContext) -> Result<Step, ApiError> {
        let user = ctx
            .created
            .as_ref()
            .ok_or_else(|| ApiError::internal("render_created ran before a user was stored"))?;
        Ok(Step::Done(Reply::created(json!({ "id": user.id }))?))
    }
}

/// Loads the checked user with its locations and renders the locations.
/// The user can vanish between the existence check and this read; that is
/// reported as NotFound.
pub struct RenderLocations {
    store: Arc<dyn UserStore>,
}

impl RenderLocations {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stage for RenderLocations {
    fn name(&self) -> &'static str {
        "render_locations"
    }

    fn phase(&self) -> Phase {
        Phase::Rendered
    }

    async fn run(&self, _request: &PipelineRequest, ctx: RequestContext) -> Result<Step, ApiError> {
        let id = ctx
            .checked_ids()
            .and_then(|ids| ids.first())
            .copied()
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        let found = self.store.find_with_locations(id).await?;
        let Some(found) = found else {
            tracing::warn!("User {} disappeared before its locations were read", id);
            return Err(ApiError::not_found("User not found"));
        };

        Ok(Step::Done(Reply::ok(&found.locations)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryUserStore;
    use axum::http::StatusCode;

    fn post(body: &str) -> PipelineRequest {
        PipelineRequest::new(Method::POST, "/").with_body(body.to_string())
    }

    #[tokio::test]
    async fn every_route_pipeline_builds() {
        let store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        let table = user_routes(store, &AppConfig::development().security).unwrap();

        let names: Vec<_> = table.routes().iter().map(|r| r.pipeline.name()).collect();
        assert_eq!(names, vec!["create_user", "get_user", "get_user_locations"]);
        assert_eq!(
            table.routes()[2].pipeline.stage_names(),
            vec![
                "is_authenticated",
                "set_ids",
                "id_validator",
                "check_users",
                "check_access_for_user_ids",
                "render_locations"
            ]
        );
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let err = ValidateUserInput.run(&post("{not json"), RequestContext::new()).await.err().unwrap();
        assert_eq!(err.kind(), "BadRequest");
    }

    #[tokio::test]
    async fn non_object_body_is_invalid_input() {
        let err = ValidateUserInput.run(&post("[1, 2]"), RequestContext::new()).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.field_errors().is_some_and(|errors| errors.contains_key("body")));
    }

    #[tokio::test]
    async fn wrongly_typed_fields_are_invalid_input() {
        let err = ValidateUserInput
            .run(&post(r#"{"username": 42}"#), RequestContext::new())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), "InvalidInput");
    }

    #[tokio::test]
    async fn locations_race_is_not_found() {
        let store = Arc::new(MemoryUserStore::new());
        let user = store
            .create(NewUser {
                username: "ada".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();

        let mut ctx = RequestContext::new();
        ctx.mark_checked(vec![user.id]);
        store.remove_user(user.id).await;

        let err = RenderLocations::new(store)
            .run(&PipelineRequest::new(Method::GET, "/"), ctx)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), "NotFound");
    }
}
