pub mod response;
pub mod session;

pub use response::{respond, Reply};
pub use session::resolve_session;
