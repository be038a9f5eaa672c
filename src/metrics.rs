//! Prometheus metrics for ingestion, deletion, probing and request latency.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

use crate::error::ServiceError;

// === Metric Name Constants ===

/// Measurements accepted counter metric name.
pub const METRIC_MEASUREMENTS_INGESTED: &str = "measurements_ingested_total";
/// Rejected ingest batches counter metric name.
pub const METRIC_INGEST_REJECTED: &str = "ingest_rejected_total";
/// Sensor deletion requests counter metric name.
pub const METRIC_SENSOR_DELETIONS: &str = "sensor_deletions_total";
/// Measurements removed by deletion counter metric name.
pub const METRIC_MEASUREMENTS_REMOVED: &str = "measurements_removed_total";
/// Failed health probes counter metric name.
pub const METRIC_PROBE_FAILURES: &str = "health_probe_failures_total";
/// Current store size gauge metric name.
pub const METRIC_STORED_MEASUREMENTS: &str = "stored_measurements";
/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";

/// Install the global Prometheus recorder and describe every metric.
pub fn install_recorder() -> Result<PrometheusHandle, ServiceError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Initialize all metric descriptions.
pub fn init_metrics() {
    describe_counter!(
        METRIC_MEASUREMENTS_INGESTED,
        "Total number of measurements appended to the store"
    );
    describe_counter!(
        METRIC_INGEST_REJECTED,
        "Total number of ingest batches rejected by validation"
    );
    describe_counter!(
        METRIC_SENSOR_DELETIONS,
        "Total number of sensor deletion requests"
    );
    describe_counter!(
        METRIC_MEASUREMENTS_REMOVED,
        "Total number of measurements removed by sensor deletion"
    );
    describe_counter!(
        METRIC_PROBE_FAILURES,
        "Total number of failed downstream health probes"
    );
    describe_gauge!(
        METRIC_STORED_MEASUREMENTS,
        "Number of measurements currently held in memory"
    );
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP handler latency in milliseconds"
    );

    debug!("Metrics initialized");
}

/// Add to the ingested measurements counter.
pub fn inc_measurements_ingested(count: usize) {
    counter!(METRIC_MEASUREMENTS_INGESTED).increment(count as u64);
}

/// Increment rejected batches counter.
pub fn inc_ingest_rejected() {
    counter!(METRIC_INGEST_REJECTED).increment(1);
}

/// Record a sensor deletion and how many records it removed.
pub fn record_sensor_deletion(removed: usize) {
    counter!(METRIC_SENSOR_DELETIONS).increment(1);
    counter!(METRIC_MEASUREMENTS_REMOVED).increment(removed as u64);
}

/// Increment probe failures counter, labelled by failure kind.
pub fn inc_probe_failures(reason: &'static str) {
    counter!(METRIC_PROBE_FAILURES, "reason" => reason).increment(1);
}

/// Set the current store size.
pub fn set_stored_measurements(len: usize) {
    gauge!(METRIC_STORED_MEASUREMENTS).set(len as f64);
}

/// RAII guard for timing handlers.
/// Records latency for its endpoint when dropped.
pub struct LatencyTimer {
    start: Instant,
    endpoint: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given endpoint.
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            start: Instant::now(),
            endpoint,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => self.endpoint)
            .record(self.elapsed_ms());
    }
}
