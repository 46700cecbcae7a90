//! REST API layer: routes, handlers and structured error responses.

pub mod error;
pub mod handlers;
mod rest;

pub use error::{ApiError, ErrorCode};
pub use rest::router;
