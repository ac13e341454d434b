//! Metrics collection and exposition.
//!
//! # Metrics
//! - `failover_events_total` (counter): failures reported, by service
//! - `failover_no_replacement_total` (counter): failures with nothing left to take over
//! - `failover_callback_errors_total` (counter): callbacks that failed or panicked
//! - `failover_recovery_attempts_total` (counter): recovery attempts by service, outcome
//! - `failover_instance_healthy` (gauge): 1=eligible, 0=failed or recovering
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so the registry can
//!   be used as a library without an exporter

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, address = %addr, "Failed to install metrics exporter"),
    }
}

pub fn record_failover(service: &str) {
    metrics::counter!("failover_events_total", "service" => service.to_string()).increment(1);
}

pub fn record_no_replacement(service: &str) {
    metrics::counter!("failover_no_replacement_total", "service" => service.to_string()).increment(1);
}

pub fn record_callback_error(service: &str) {
    metrics::counter!("failover_callback_errors_total", "service" => service.to_string()).increment(1);
}

pub fn record_recovery(service: &str, outcome: &str) {
    metrics::counter!(
        "failover_recovery_attempts_total",
        "service" => service.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_instance_health(service: &str, instance: &str, healthy: bool) {
    metrics::gauge!(
        "failover_instance_healthy",
        "service" => service.to_string(),
        "instance" => instance.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}
