//! Metrics sink for the ingestion pipeline and HTTP layer.
//!
//! All helpers go through the `metrics` facade and are fire-and-forget: with
//! no recorder installed they are no-ops, and they never fail the caller.
//! [`install_prometheus_recorder`] installs the Prometheus recorder whose
//! handle renders `GET /metrics`.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

use crate::application::ingestion::CircuitState;

const EXPONENTIAL_SECONDS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Installs the process-wide Prometheus recorder.
///
/// # Errors
///
/// Returns an error if a global recorder is already installed.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets(EXPONENTIAL_SECONDS)?
        .install_recorder()
}

pub fn record_http_request(method: &str, path: &str, status: u16, latency: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_request_duration_seconds", &labels).record(latency.as_secs_f64());
}

/// Counts a processed click; `outcome` is `accepted`, `duplicate` or an error kind.
pub fn record_click(ad_id: &str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        "ad_clicks_total",
        "ad_id" => ad_id.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("click_processing_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_db_operation(operation: &'static str, success: bool, elapsed: Duration) {
    let status = if success { "success" } else { "error" };

    metrics::counter!(
        "database_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "database_operation_duration_seconds",
        "operation" => operation
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_error(error_type: &'static str, component: &'static str) {
    metrics::counter!(
        "errors_total",
        "error_type" => error_type,
        "component" => component
    )
    .increment(1);
}

pub fn record_batch_pending(pending: usize) {
    metrics::gauge!("click_batch_pending").set(pending as f64);
}

/// Publishes the breaker state as 0 (closed), 1 (half-open) or 2 (open).
pub fn record_breaker_state(name: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };

    metrics::gauge!("circuit_breaker_state", "name" => name.to_string()).set(value);
}

pub fn record_breaker_rejection(name: &str) {
    metrics::counter!("circuit_breaker_rejections_total", "name" => name.to_string()).increment(1);
}

pub fn record_fallback() {
    metrics::counter!("click_fallbacks_total").increment(1);
}
