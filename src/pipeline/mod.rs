// Request pipeline: typed context, stages, the driver and the route registry

pub mod context;
pub mod driver;
pub mod registry;
pub mod request;
pub mod stage;

// Re-export core types
pub use context::{DocumentKey, RequestContext};
pub use driver::{Pipeline, PipelineBuilder, PipelineError};
pub use registry::{PathPattern, RouteLookup, RouteTable};
pub use request::PipelineRequest;
pub use stage::{Phase, Stage, Step};
