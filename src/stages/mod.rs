// Reusable pipeline stages, in the order routes usually chain them

pub mod access;
pub mod ids;
pub mod lookup;
pub mod render;

pub use access::{CheckAccessForUserIds, IsAuthenticated};
pub use ids::{IdValidator, SetIds};
pub use lookup::{CheckUsers, FetchUsers};
pub use render::{AssignSingleDocument, RenderResult};
