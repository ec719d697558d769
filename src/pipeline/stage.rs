use async_trait::async_trait;

use crate::error::ApiError;
use crate::middleware::response::Reply;
use crate::pipeline::context::RequestContext;
use crate::pipeline::request::PipelineRequest;

/// Where a request stands in its route. Stages move it forward only:
/// Start -> Validated -> (Stored | Loaded) -> Authorized -> Rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Start,
    Validated, // Input, identifiers and credentials checked
    Stored,    // A document was written
    Loaded,    // Documents were read or confirmed to exist
    Authorized,
    Rendered, // A reply was produced
}

impl Phase {
    /// Ordering rank; Stored and Loaded are alternatives at the same step
    pub fn rank(&self) -> u8 {
        match self {
            Phase::Start => 0,
            Phase::Validated => 1,
            Phase::Stored | Phase::Loaded => 2,
            Phase::Authorized => 3,
            Phase::Rendered => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Rendered)
    }
}

/// What a stage hands back to the driver on success
pub enum Step {
    /// Continue with the updated context
    Next(RequestContext),
    /// Finish the request with this reply
    Done(Reply),
}

/// A single unit of a route's pipeline.
///
/// Stages read the request, take the context by value and either return the
/// context for the next stage, a finished reply, or an error for the
/// responder. They never write HTTP responses themselves.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name for logging and debugging
    fn name(&self) -> &'static str;

    /// Phase the request reaches once this stage succeeds
    fn phase(&self) -> Phase;

    async fn run(&self, request: &PipelineRequest, ctx: RequestContext) -> Result<Step, ApiError>;
}
