//! HTTP boundary for the booking engine.

pub mod handlers;
pub mod rest;

pub use handlers::ApiState;
pub use rest::{create_rest_router, RestApiConfig};
