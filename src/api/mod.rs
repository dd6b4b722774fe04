//! # HTTP API
//!
//! Axum-based HTTP frontend. Routes map 1:1 to [`SecretService`] operations;
//! every route except `/` and `/health` sits behind the `X-API-Key` gate.
//!
//! [`SecretService`]: crate::service::SecretService

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
pub use server::start_api_server;
