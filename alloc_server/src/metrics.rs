//! Prometheus metrics for allocation outcomes.

use std::net::SocketAddr;

use metrics::counter;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record an allocation written (`op` is "create" or "update").
pub fn allocation_committed(op: &str) {
    counter!("alloc_allocations_committed_total", "op" => op.to_string()).increment(1);
}

/// Record an allocation refused by the admission rules.
pub fn allocation_rejected(reason: &str) {
    counter!("alloc_allocations_rejected_total", "reason" => reason.to_string()).increment(1);
}

pub fn entity_deleted(kind: &str) {
    counter!("alloc_entities_deleted_total", "kind" => kind.to_string()).increment(1);
}
