//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define admission metrics (admitted, denied per component,
//!   sanitizer-dropped keys, tracked rate-limit keys)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gatekeeper_requests_denied_total` (counter): denials by component
//! - `gatekeeper_sanitizer_dropped_keys_total` (counter)
//! - `gatekeeper_rate_limit_tracked_keys` (gauge)
//!
//! # Design Decisions
//! - Updates are cheap atomic operations through the `metrics` facade
//! - The exporter is optional; when disabled the recorders are no-ops

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter on `addr`.
///
/// Must run inside the Tokio runtime. Failure to bind is logged, not
/// fatal: the gateway keeps serving without exposition.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "failed to install metrics exporter"),
    }
}

/// Record a denial from the admission chain.
pub fn record_denied(component: &'static str) {
    counter!("gatekeeper_requests_denied_total", "component" => component).increment(1);
}

/// Record a mapping key dropped by the sanitizer.
pub fn record_dropped_key() {
    counter!("gatekeeper_sanitizer_dropped_keys_total").increment(1);
}

/// Record the number of rate-limit records currently tracked.
pub fn record_tracked_keys(count: usize) {
    gauge!("gatekeeper_rate_limit_tracked_keys").set(count as f64);
}
