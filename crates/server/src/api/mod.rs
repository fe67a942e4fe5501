pub mod cleanup;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod progress;
pub mod routes;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
