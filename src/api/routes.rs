//! HTTP API route definitions.

use axum::{routing::get, routing::post, Json, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::handlers::{self, delete_sensor, healthz, ingest, prometheus, statistics, AppState};
use super::types::{ErrorDetail, SensorReading, StatsResponse};

/// OpenAPI document for the public endpoints.
#[derive(OpenApi)]
#[openapi(
    info(title = "sensor-stats", description = "Sensor measurement ingestion and statistics"),
    paths(handlers::ingest, handlers::statistics, handlers::delete_sensor, handlers::healthz),
    components(schemas(SensorReading, StatsResponse, ErrorDetail)),
    tags(
        (name = "measurements", description = "Ingest, query and delete measurements"),
        (name = "health", description = "Downstream readiness")
    )
)]
pub struct ApiDoc;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Measurements
        .route("/data", post(ingest))
        .route("/statistics/:sensor_id", get(statistics).delete(delete_sensor))
        // Health endpoint
        .route("/healthz", get(healthz))
        // Introspection
        .route("/metrics", get(prometheus))
        .route("/openapi.json", get(openapi))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
