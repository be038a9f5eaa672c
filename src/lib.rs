//! Sensor measurement ingestion and statistics service.
//!
//! Batches of timestamped readings are posted over HTTP and kept in an
//! in-memory log. Queries report count, average and the most recently
//! appended timestamp.
//!
//! ```text
//! POST   /data                     append a batch (all-or-nothing)
//! GET    /statistics/{sensor_id}   aggregates
//! DELETE /statistics/{sensor_id}   drop one sensor's history
//! GET    /healthz                  204 if the downstream probe is ready
//! ```
//!
//! By default statistics are store-wide and ignore `sensor_id`. Set
//! `STATS_SCOPE=sensor` to aggregate per sensor instead.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`store`]: The in-memory measurement log
//! - [`probe`]: Downstream liveness probe
//! - [`api`]: HTTP handlers, routes and wire types
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{ApiError, Result, ServiceError};
