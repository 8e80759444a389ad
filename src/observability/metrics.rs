//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guestbook_node_requests_total` (counter): node API calls by endpoint, outcome
//! - `guestbook_node_healthy` (gauge): 1=reachable, 0=unreachable
//! - `guestbook_messages_fetched` (gauge): size of the last fetched message list
//! - `guestbook_pending_transactions` (gauge): pending entries awaiting a terminal status
//! - `guestbook_tx_outcomes_total` (counter): terminal statuses by kind, status
//! - `guestbook_http_requests_total` (counter): API requests by route, status
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_node_request(endpoint: &'static str, outcome: &'static str) {
    ::metrics::counter!(
        "guestbook_node_requests_total",
        "endpoint" => endpoint,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_node_health(healthy: bool) {
    ::metrics::gauge!("guestbook_node_healthy").set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_messages_fetched(count: usize) {
    ::metrics::gauge!("guestbook_messages_fetched").set(count as f64);
}

pub fn record_pending_transactions(count: usize) {
    ::metrics::gauge!("guestbook_pending_transactions").set(count as f64);
}

/// A pending transaction reached a terminal status.
pub fn record_tx_outcome(kind: &'static str, status: &str) {
    ::metrics::counter!(
        "guestbook_tx_outcomes_total",
        "kind" => kind,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_http_request(route: &str, status: u16) {
    ::metrics::counter!(
        "guestbook_http_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
