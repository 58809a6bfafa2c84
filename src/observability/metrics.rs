//! Metrics collection and exposition.
//!
//! # Metrics
//! - `teeproxy_requests_total` (counter): inbound requests by method, status, mirrored
//! - `teeproxy_request_duration_seconds` (histogram): client-facing latency
//! - `teeproxy_dispatch_total` (counter): upstream round trips by backend, outcome
//! - `teeproxy_dispatch_duration_seconds` (histogram): upstream latency by backend
//! - `teeproxy_comparisons_total` (counter): equal / not_equal / indeterminate
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus endpoint is optional

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

use crate::upstream::BackendRole;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, mirrored: bool, start: Instant) {
    counter!(
        "teeproxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "mirrored" => if mirrored { "true" } else { "false" }
    )
    .increment(1);
    histogram!("teeproxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_dispatch(role: BackendRole, outcome: &'static str, start: Instant) {
    counter!("teeproxy_dispatch_total", "backend" => role.as_str(), "outcome" => outcome).increment(1);
    histogram!("teeproxy_dispatch_duration_seconds", "backend" => role.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_comparison(outcome: &'static str) {
    counter!("teeproxy_comparisons_total", "outcome" => outcome).increment(1);
}
