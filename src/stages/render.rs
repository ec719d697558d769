// Response shaping
use async_trait::async_trait;

use crate::error::ApiError;
use crate::middleware::response::Reply;
use crate::pipeline::{DocumentKey, Phase, PipelineRequest, RequestContext, Stage, Step};

/// Republishes the first document under `source` as the single document `dest`
pub struct AssignSingleDocument {
    source: DocumentKey,
    dest: DocumentKey,
}

impl AssignSingleDocument {
    pub fn new(source: DocumentKey, dest: DocumentKey) -> Self {
        Self { source, dest }
    }
}

#[async_trait]
impl Stage for AssignSingleDocument {
    fn name(&self) -> &'static str {
        "assign_single_document"
    }

    fn phase(&self) -> Phase {
        Phase::Loaded
    }

    async fn run(&self, _request: &PipelineRequest, mut ctx: RequestContext) -> Result<Step, ApiError> {
        let first = ctx
            .documents(self.source)
            .and_then(|users| users.first())
            .cloned()
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        ctx.set_single(self.dest, first);
        Ok(Step::Next(ctx))
    }
}

/// Terminal stage: the single document under `key` as a 200 JSON body
pub struct RenderResult {
    key: DocumentKey,
}

impl RenderResult {
    pub fn new(key: DocumentKey) -> Self {
        Self { key }
    }
}

#[async_trait]
impl Stage for RenderResult {
    fn name(&self) -> &'static str {
        "render_result"
    }

    fn phase(&self) -> Phase {
        Phase::Rendered
    }

    async fn run(&self, _request: &PipelineRequest, ctx: RequestContext) -> Result<Step, ApiError> {
        let document = ctx
            .single(self.key)
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        Ok(Step::Done(Reply::ok(document)?))
    }
}
