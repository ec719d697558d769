// Identifier resolution and validity
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ApiError;
use crate::pipeline::{Phase, PipelineRequest, RequestContext, Stage, Step};

type Extractor = Arc<dyn Fn(&PipelineRequest) -> Vec<String> + Send + Sync>;

/// Puts the candidate identifiers chosen by `extract` into the context.
/// Never fails; an empty list is passed on as is.
pub struct SetIds {
    extract: Extractor,
}

impl SetIds {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&PipelineRequest) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            extract: Arc::new(extract),
        }
    }

    /// Take the single identifier captured by a path parameter
    pub fn from_param(name: &'static str) -> Self {
        Self::new(move |request| request.param(name).map(str::to_string).into_iter().collect())
    }
}

#[async_trait]
impl Stage for SetIds {
    fn name(&self) -> &'static str {
        "set_ids"
    }

    fn phase(&self) -> Phase {
        Phase::Validated
    }

    async fn run(&self, request: &PipelineRequest, mut ctx: RequestContext) -> Result<Step, ApiError> {
        ctx.candidate_ids = (self.extract)(request);
        Ok(Step::Next(ctx))
    }
}

/// Rejects any candidate that is not a well-formed user identifier
pub struct IdValidator;

#[async_trait]
impl Stage for IdValidator {
    fn name(&self) -> &'static str {
        "id_validator"
    }

    fn phase(&self) -> Phase {
        Phase::Validated
    }

    async fn run(&self, _request: &PipelineRequest, mut ctx: RequestContext) -> Result<Step, ApiError> {
        ctx.user_ids = parse_ids(&ctx.candidate_ids)?;
        Ok(Step::Next(ctx))
    }
}

pub fn parse_ids(candidates: &[String]) -> Result<Vec<Uuid>, ApiError> {
    candidates
        .iter()
        .map(|raw| {
            Uuid::parse_str(raw).map_err(|_| ApiError::invalid_identifier(format!("Invalid user id: {}", raw)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use std::collections::HashMap;

    async fn run(stage: &dyn Stage, request: &PipelineRequest, ctx: RequestContext) -> Result<RequestContext, ApiError> {
        match stage.run(request, ctx).await? {
            Step::Next(ctx) => Ok(ctx),
            Step::Done(_) => panic!("identifier stages never reply"),
        }
    }

    #[tokio::test]
    async fn set_ids_reads_the_path_param() {
        let params = HashMap::from([("userId".to_string(), "abc".to_string())]);
        let request = PipelineRequest::new(Method::GET, "/id/abc").with_params(params);

        let ctx = run(&SetIds::from_param("userId"), &request, RequestContext::new()).await.unwrap();
        assert_eq!(ctx.candidate_ids, vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn set_ids_allows_an_empty_list() {
        let request = PipelineRequest::new(Method::GET, "/");
        let ctx = run(&SetIds::from_param("userId"), &request, RequestContext::new()).await.unwrap();
        assert!(ctx.candidate_ids.is_empty());

        let ctx = run(&IdValidator, &request, ctx).await.unwrap();
        assert!(ctx.user_ids.is_empty());
    }

    #[tokio::test]
    async fn id_validator_rejects_malformed_ids() {
        let good = Uuid::new_v4();
        let mut ctx = RequestContext::new();
        ctx.candidate_ids = vec![good.to_string(), "not-an-id".to_string()];

        let err = run(&IdValidator, &PipelineRequest::new(Method::GET, "/"), ctx).await.unwrap_err();
        assert_eq!(err, ApiError::invalid_identifier("Invalid user id: not-an-id"));
    }

    #[test]
    fn parse_ids_keeps_request_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let parsed = parse_ids(&[b.to_string(), a.to_string()]).unwrap();
        assert_eq!(parsed, vec![b, a]);
    }
}
