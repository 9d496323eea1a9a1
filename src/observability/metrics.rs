//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rlb_jumps_total` (counter): redirect requests by service, outcome
//! - `rlb_jump_duration_seconds` (histogram): jump route latency
//! - `rlb_probe_duration_seconds` (histogram): liveness probe latency by method
//! - `rlb_node_alive` (gauge): 1=alive, 0=dead, per service and server
//! - `rlb_rate_limited_total` (counter): requests rejected by the rate limiter
//! - `rlb_stats_submissions_total` (counter): usage stats posts by result
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::health::probe::ProbeMethod;

/// Install the Prometheus recorder with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_jump(service: &str, outcome: &'static str) {
    counter!("rlb_jumps_total", "service" => service.to_string(), "outcome" => outcome).increment(1);
}

pub fn record_jump_duration(elapsed: Duration) {
    histogram!("rlb_jump_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_probe(method: ProbeMethod, elapsed: Duration) {
    histogram!("rlb_probe_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_node_alive(service: &str, server: &str, alive: bool) {
    gauge!(
        "rlb_node_alive",
        "service" => service.to_string(),
        "server" => server.to_string()
    )
    .set(if alive { 1.0 } else { 0.0 });
}

pub fn record_rate_limited() {
    counter!("rlb_rate_limited_total").increment(1);
}

pub fn record_stats_submission(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    counter!("rlb_stats_submissions_total", "result" => result).increment(1);
}
