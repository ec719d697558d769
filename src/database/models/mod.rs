pub mod location;
pub mod user;

pub use location::{Location, UserWithLocations};
pub use user::{NewUser, User, UNIQUE_FIELDS};
