//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_mints_total` (counter): redemptions by terminal outcome
//! - `relay_mint_duration_seconds` (histogram): end-to-end redemption latency
//! - `relay_candidate_outcomes_total` (counter): per-sender attempt results
//! - `relay_rollback_failures_total` (counter): vouchers lost to a failed release
//! - `relay_finalize_failures_total` (counter): submitted mints whose voucher stayed in flight

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus exporter"),
    }
}

pub fn record_mint(outcome: &'static str, start_time: Instant) {
    ::metrics::counter!("relay_mints_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("relay_mint_duration_seconds", "outcome" => outcome)
        .record(start_time.elapsed().as_secs_f64());
}

pub fn record_candidate(outcome: &'static str) {
    ::metrics::counter!("relay_candidate_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_rollback_failure() {
    ::metrics::counter!("relay_rollback_failures_total").increment(1);
}

pub fn record_finalize_failure() {
    ::metrics::counter!("relay_finalize_failures_total").increment(1);
}
