// Authentication and authorization gates
use async_trait::async_trait;

use crate::auth::SessionState;
use crate::error::ApiError;
use crate::pipeline::{Phase, PipelineRequest, RequestContext, Stage, Step};

/// Requires an authenticated session; `reason` becomes the 401 message
pub struct IsAuthenticated {
    reason: String,
}

impl IsAuthenticated {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl Stage for IsAuthenticated {
    fn name(&self) -> &'static str {
        "is_authenticated"
    }

    fn phase(&self) -> Phase {
        Phase::Validated
    }

    async fn run(&self, request: &PipelineRequest, mut ctx: RequestContext) -> Result<Step, ApiError> {
        match &request.session {
            SessionState::Authenticated(caller) => {
                ctx.caller = Some(caller.clone());
                Ok(Step::Next(ctx))
            }
            SessionState::Invalid(why) => {
                tracing::debug!("Unauthenticated request, invalid session: {}", why);
                Err(ApiError::unauthenticated(self.reason.clone()))
            }
            SessionState::Anonymous => Err(ApiError::unauthenticated(self.reason.clone())),
        }
    }
}

/// Allows the request only if the caller owns every checked identifier or is
/// privileged. Must come after authentication and an existence check.
pub struct CheckAccessForUserIds {
    reason: String,
}

impl CheckAccessForUserIds {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl Stage for CheckAccessForUserIds {
    fn name(&self) -> &'static str {
        "check_access_for_user_ids"
    }

    fn phase(&self) -> Phase {
        Phase::Authorized
    }

    async fn run(&self, _request: &PipelineRequest, ctx: RequestContext) -> Result<Step, ApiError> {
        let caller = ctx
            .caller
            .as_ref()
            .ok_or_else(|| ApiError::internal("authorization ran before authentication"))?;
        let targets = ctx
            .checked_ids()
            .ok_or_else(|| ApiError::internal("authorization ran before an existence check"))?;

        let owns_all = !targets.is_empty() && targets.iter().all(|id| *id == caller.user_id);
        if !(owns_all || caller.is_privileged()) {
            tracing::warn!("User {} denied access to {:?}", caller.user_id, targets);
            return Err(ApiError::forbidden(self.reason.clone()));
        }

        Ok(Step::Next(ctx))
    }
}
