//! HTTP API handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::types::{validate_batch, ErrorDetail, SensorReading, StatsResponse};
use crate::error::ApiError;
use crate::metrics::{self, LatencyTimer};
use crate::probe::{HealthProbe, ProbeOutcome};
use crate::store::{MeasurementStore, StatsScope};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// The measurement log.
    pub store: Arc<RwLock<MeasurementStore>>,
    /// Downstream liveness probe.
    pub probe: HealthProbe,
    /// Aggregation scope for statistics queries.
    pub stats_scope: StatsScope,
    /// Prometheus render handle, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state with an empty store.
    pub fn new(probe: HealthProbe, stats_scope: StatsScope) -> Self {
        Self {
            store: Arc::new(RwLock::new(MeasurementStore::new())),
            probe,
            stats_scope,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle so `/metrics` can render.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Ingest a batch of sensor readings.
///
/// The batch is decoded and validated in full before anything is appended.
#[utoipa::path(
    post,
    path = "/data",
    tag = "measurements",
    request_body = Vec<SensorReading>,
    responses(
        (status = 200, description = "Batch stored"),
        (status = 422, description = "Malformed item, nothing stored", body = ErrorDetail)
    )
)]
#[instrument(skip_all)]
pub async fn ingest(
    State(state): State<AppState>,
    payload: Result<Json<Vec<SensorReading>>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let _timer = LatencyTimer::new("ingest");

    let measurements = payload
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
        .and_then(|Json(readings)| validate_batch(readings))
        .inspect_err(|e| {
            debug!(error = %e, "Rejected ingest batch");
            metrics::inc_ingest_rejected();
        })?;

    let accepted = measurements.len();
    let stored = {
        let mut store = state.store.write().await;
        store.append(measurements);
        store.len()
    };

    debug!(accepted, stored, "Ingested batch");
    metrics::inc_measurements_ingested(accepted);
    metrics::set_stored_measurements(stored);

    Ok(StatusCode::OK)
}

/// Statistics for a sensor.
///
/// Under the default `store` scope the sensor id is accepted but not used:
/// the aggregates cover every stored measurement.
#[utoipa::path(
    get,
    path = "/statistics/{sensor_id}",
    tag = "measurements",
    params(("sensor_id" = String, Path, description = "Sensor identifier")),
    responses((status = 200, description = "Aggregates", body = StatsResponse))
)]
#[instrument(skip(state))]
pub async fn statistics(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
) -> Json<StatsResponse> {
    let _timer = LatencyTimer::new("statistics");

    let snapshot = state
        .store
        .read()
        .await
        .snapshot_for(state.stats_scope, &sensor_id);

    Json(snapshot.into())
}

/// Delete every measurement of a sensor. Unknown sensors succeed.
#[utoipa::path(
    delete,
    path = "/statistics/{sensor_id}",
    tag = "measurements",
    params(("sensor_id" = String, Path, description = "Sensor identifier")),
    responses((status = 200, description = "Sensor history removed"))
)]
#[instrument(skip(state))]
pub async fn delete_sensor(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
) -> StatusCode {
    let _timer = LatencyTimer::new("delete_sensor");

    let (removed, stored) = {
        let mut store = state.store.write().await;
        let removed = store.remove_by_sensor(&sensor_id);
        (removed, store.len())
    };

    info!(removed, "Deleted sensor history");
    metrics::record_sensor_deletion(removed);
    metrics::set_stored_measurements(stored);

    StatusCode::OK
}

/// Liveness check, answered by probing the downstream service.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses(
        (status = 204, description = "Downstream is ready"),
        (status = 400, description = "Downstream is not ready", body = ErrorDetail)
    )
)]
#[instrument(skip_all)]
pub async fn healthz(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    let _timer = LatencyTimer::new("healthz");

    match state.probe.check().await {
        ProbeOutcome::Ready => Ok(StatusCode::NO_CONTENT),
        ProbeOutcome::Failed(reason) => {
            metrics::inc_probe_failures(reason.kind());
            Err(ApiError::NotReady)
        }
    }
}

/// Prometheus exposition, 404 when metrics are disabled.
pub async fn prometheus(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
