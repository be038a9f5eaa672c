//! Unified error types for the sensor statistics service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::types::ErrorDetail;

/// Message returned when the downstream liveness probe fails.
pub const NOT_READY_DETAIL: &str = "Server is not ready to receive data";

/// Unified error type for service startup and operation.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Prometheus recorder could not be installed.
    #[error("metrics error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced to HTTP callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Ingest payload could not be decoded or validated.
    #[error("{0}")]
    Validation(String),

    /// The downstream liveness probe did not report ready.
    #[error("{}", NOT_READY_DETAIL)]
    NotReady,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotReady => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorDetail {
            detail: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServiceError>;
