//! HTTP API module for ingestion, statistics and health endpoints.

pub mod handlers;
pub mod routes;
pub mod types;

pub use handlers::AppState;
pub use routes::{create_router, ApiDoc};
