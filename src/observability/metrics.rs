//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, upstream scheme
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_rate_limited_total` (counter): requests denied by the admission gate
//! - `gateway_upstream_errors_total` (counter): transport failures by kind
//! - `gateway_filter_errors_total` (counter): filter failures by filter and phase
//! - `gateway_timeouts_total` (counter): requests cut off by the deadline

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        return;
    }

    describe_counter!("gateway_requests_total", Unit::Count, "Requests handled");
    describe_histogram!(
        "gateway_request_duration_seconds",
        Unit::Seconds,
        "End-to-end request latency"
    );
    describe_counter!("gateway_rate_limited_total", Unit::Count, "Requests denied by the rate limiter");
    describe_counter!("gateway_upstream_errors_total", Unit::Count, "Upstream transport failures");
    describe_counter!("gateway_filter_errors_total", Unit::Count, "Filter failures");
    describe_counter!("gateway_timeouts_total", Unit::Count, "Requests that hit the deadline");

    tracing::info!(address = %addr, "Metrics exporter listening");
}

pub fn record_request(method: &str, status: u16, scheme: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("scheme", scheme.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(mode: &str) {
    counter!("gateway_rate_limited_total", "mode" => mode.to_string()).increment(1);
}

pub fn record_upstream_error(kind: &str) {
    counter!("gateway_upstream_errors_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_filter_error(filter: &str, phase: &str) {
    let labels = [("filter", filter.to_string()), ("phase", phase.to_string())];
    counter!("gateway_filter_errors_total", &labels).increment(1);
}

pub fn record_timeout() {
    counter!("gateway_timeouts_total").increment(1);
}
