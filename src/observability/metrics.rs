//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_decisions_total` (counter): gate outcomes by `outcome`
//! - `gate_tracked_clients` (gauge): records held by the tracker
//! - `gate_evictions_total` (counter): records removed by the collector
//! - `gate_upstream_requests_total` (counter): forwarded requests by `status`
//! - `gate_upstream_duration_seconds` (histogram): upstream latency
//!
//! Recording is a no-op until [`init_metrics`] installs a recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_decision(outcome: &'static str) {
    counter!("gate_decisions_total", "outcome" => outcome).increment(1);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("gate_tracked_clients").set(count as f64);
}

pub fn record_evictions(count: usize) {
    if count > 0 {
        counter!("gate_evictions_total").increment(count as u64);
    }
}

pub fn record_upstream(status: u16, start: Instant) {
    counter!("gate_upstream_requests_total", "status" => status.to_string()).increment(1);
    histogram!("gate_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}
