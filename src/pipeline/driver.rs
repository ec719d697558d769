// Route pipeline: an ordered list of stages run by a single driver
use std::sync::Arc;

use thiserror::Error;

use crate::error::ApiError;
use crate::middleware::response::Reply;
use crate::pipeline::context::RequestContext;
use crate::pipeline::request::PipelineRequest;
use crate::pipeline::stage::{Phase, Stage, Step};

/// Errors detected while assembling a pipeline
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("pipeline '{0}' has no stages")]
    Empty(&'static str),

    #[error("pipeline '{pipeline}': stage '{stage}' ({phase:?}) cannot follow {after:?}")]
    PhaseRegression {
        pipeline: &'static str,
        stage: &'static str,
        phase: Phase,
        after: Phase,
    },

    #[error("pipeline '{pipeline}' must end in a rendering stage, found '{stage}'")]
    MissingRenderer {
        pipeline: &'static str,
        stage: &'static str,
    },
}

/// A fixed, ordered chain of stages for one route
pub struct Pipeline {
    name: &'static str,
    stages: Vec<Arc<dyn Stage>>,
}

pub struct PipelineBuilder {
    name: &'static str,
    stages: Vec<Arc<dyn Stage>>,
}

impl PipelineBuilder {
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Check the stage order and freeze the pipeline. Phases may repeat but
    /// never go backwards, and the last stage must render.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let last = self.stages.last().ok_or(PipelineError::Empty(self.name))?;
        if !last.phase().is_terminal() {
            return Err(PipelineError::MissingRenderer {
                pipeline: self.name,
                stage: last.name(),
            });
        }

        let mut current = Phase::Start;
        for stage in &self.stages {
            let phase = stage.phase();
            if phase.rank() < current.rank() {
                return Err(PipelineError::PhaseRegression {
                    pipeline: self.name,
                    stage: stage.name(),
                    phase,
                    after: current,
                });
            }
            current = phase;
        }

        tracing::debug!("Built pipeline '{}' with {} stages", self.name, self.stages.len());
        Ok(Pipeline {
            name: self.name,
            stages: self.stages,
        })
    }
}

impl Pipeline {
    pub fn builder(name: &'static str) -> PipelineBuilder {
        PipelineBuilder {
            name,
            stages: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Thread a fresh context through every stage until one replies or fails
    pub async fn execute(&self, request: &PipelineRequest) -> Result<Reply, ApiError> {
        let mut ctx = RequestContext::new();
        let started_at = ctx.started_at;

        for stage in &self.stages {
            match stage.run(request, ctx).await {
                Ok(Step::Next(next)) => {
                    ctx = next;
                    ctx.phase = stage.phase();
                    tracing::debug!(
                        "Pipeline {}: stage {} passed, phase {:?}",
                        self.name,
                        stage.name(),
                        ctx.phase
                    );
                }
                Ok(Step::Done(reply)) => {
                    tracing::debug!(
                        "Pipeline {}: stage {} replied {} in {:?}",
                        self.name,
                        stage.name(),
                        reply.status,
                        started_at.elapsed()
                    );
                    return Ok(reply);
                }
                Err(error) => {
                    tracing::warn!(
                        "Pipeline {}: {} {} rejected at stage {} with {}",
                        self.name,
                        request.method,
                        request.path,
                        stage.name(),
                        error.kind()
                    );
                    return Err(error);
                }
            }
        }

        Err(ApiError::internal(format!(
            "pipeline '{}' finished without a reply",
            self.name
        )))
    }
}
