//! Prometheus metrics for monitoring server health.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener,
//! scraped at `http://<addr>/metrics`.

#![allow(dead_code)] // Public API; not every metric has a call site yet

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))
}

// ============================================================================
// Admission metrics
// ============================================================================

/// Increment the created-rooms counter.
pub fn rooms_created_total() {
    metrics::counter!("rooms_created_total").increment(1);
}

/// Increment the joins counter.
pub fn room_joins_total() {
    metrics::counter!("room_joins_total").increment(1);
}

/// Set the current live-room gauge.
pub fn active_rooms(count: usize) {
    metrics::gauge!("active_rooms").set(count as f64);
}

// ============================================================================
// Session metrics
// ============================================================================

/// Increment the total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment the inbound frame counter.
pub fn websocket_frames_received() {
    metrics::counter!("websocket_frames_received").increment(1);
}

/// Increment the outbound frame counter.
pub fn websocket_frames_sent() {
    metrics::counter!("websocket_frames_sent").increment(1);
}

/// Increment the liveness-timeout counter.
pub fn websocket_liveness_timeouts_total() {
    metrics::counter!("websocket_liveness_timeouts_total").increment(1);
}

/// Increment the rate-limit hit counter for an endpoint.
pub fn rate_limit_hits_total(endpoint: &str) {
    metrics::counter!("rate_limit_hits_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}
