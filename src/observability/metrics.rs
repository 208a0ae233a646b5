//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total{method,status,route}` (counter)
//! - `proxy_request_duration_seconds{method,route}` (histogram)
//! - `proxy_transport_errors_total{kind}` (counter)
//! - `proxy_target_changes_total` (counter)
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a no-op
//! - `route` is `legacy`, `new_route` or `synthetic`, never a raw path

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Latency buckets in seconds.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

#[derive(Debug, thiserror::Error)]
#[error("Failed to install metrics exporter: {0}")]
pub struct MetricsError(#[from] BuildError);

/// Install the Prometheus recorder and serve it on `addr`.
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(LATENCY_BUCKETS)?
        .install()?;

    describe_counter!("proxy_requests_total", "Total requests answered by the proxy");
    describe_histogram!(
        "proxy_request_duration_seconds",
        "Time from request receipt to response head"
    );
    describe_counter!(
        "proxy_transport_errors_total",
        "Upstream transport failures by kind"
    );
    describe_counter!(
        "proxy_target_changes_total",
        "Default target updates via the control plane"
    );

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    counter!("proxy_requests_total", &labels).increment(1);

    let labels = [("method", method.to_string()), ("route", route.to_string())];
    histogram!("proxy_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_transport_error(kind: &'static str) {
    counter!("proxy_transport_errors_total", "kind" => kind).increment(1);
}

pub fn record_target_change() {
    counter!("proxy_target_changes_total").increment(1);
}
