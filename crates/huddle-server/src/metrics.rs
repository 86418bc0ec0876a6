//! Metrics collection and export for Huddle.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "huddle_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "huddle_connections_active";
    pub const MESSAGES_TOTAL: &str = "huddle_messages_total";
    pub const MESSAGES_BYTES: &str = "huddle_messages_bytes";
    pub const ROOMS_ACTIVE: &str = "huddle_rooms_active";
    pub const REQUESTS_TOTAL: &str = "huddle_requests_total";
    pub const DELIVERIES_DROPPED: &str = "huddle_deliveries_dropped_total";
    pub const LATENCY_SECONDS: &str = "huddle_request_latency_seconds";
    pub const ERRORS_TOTAL: &str = "huddle_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::CONNECTIONS_TOTAL,
        "Total number of sessions since server start"
    );
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Current number of open sessions"
    );
    metrics::describe_counter!(names::MESSAGES_TOTAL, "Total number of frames processed");
    metrics::describe_counter!(names::MESSAGES_BYTES, "Total bytes of frames processed");
    metrics::describe_gauge!(names::ROOMS_ACTIVE, "Current number of group rooms");
    metrics::describe_counter!(names::REQUESTS_TOTAL, "Requests handled, by operation");
    metrics::describe_counter!(
        names::DELIVERIES_DROPPED,
        "Room deliveries skipped because the recipient queue was full"
    );
    metrics::describe_histogram!(
        names::LATENCY_SECONDS,
        "Request handling latency in seconds"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the exporter cannot be installed.
pub fn start_metrics_server(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a new session.
pub fn record_connection() {
    counter!(names::CONNECTIONS_TOTAL).increment(1);
    gauge!(names::CONNECTIONS_ACTIVE).increment(1.0);
}

/// Record a session ending.
pub fn record_disconnection() {
    gauge!(names::CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a frame.
pub fn record_message(bytes: usize, direction: &'static str) {
    counter!(names::MESSAGES_TOTAL, "direction" => direction).increment(1);
    counter!(names::MESSAGES_BYTES, "direction" => direction).increment(bytes as u64);
}

/// Record a handled request.
pub fn record_request(operation: &'static str) {
    counter!(names::REQUESTS_TOTAL, "operation" => operation).increment(1);
}

/// Record request latency.
pub fn record_latency(seconds: f64) {
    histogram!(names::LATENCY_SECONDS).record(seconds);
}

/// Record room deliveries skipped for saturated queues.
pub fn record_dropped(count: usize) {
    if count > 0 {
        counter!(names::DELIVERIES_DROPPED).increment(count as u64);
    }
}

/// Update active room count.
pub fn set_active_rooms(count: usize) {
    gauge!(names::ROOMS_ACTIVE).set(count as f64);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Metrics guard that records the session ending on drop.
pub struct ConnectionMetricsGuard;

impl ConnectionMetricsGuard {
    /// Create a new metrics guard, recording a session.
    #[must_use]
    pub fn new() -> Self {
        record_connection();
        Self
    }
}

impl Default for ConnectionMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionMetricsGuard {
    fn drop(&mut self) {
        record_disconnection();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_guard() {
        // No recorder installed; recording must be a no-op.
        let _guard = ConnectionMetricsGuard::new();
        record_dropped(0);
        record_error("test");
    }
}
