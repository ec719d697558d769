// HTTP-facing handlers: the health probe and the pipelines behind /api/users
pub mod health;
pub mod users;

pub use health::health;
pub use users::{user_routes, USERS_PREFIX};
