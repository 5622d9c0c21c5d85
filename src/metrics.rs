//! Prometheus metrics for scan observability.
//!
//! This module provides metrics for:
//! - Rejected odds entries, by reason
//! - Incomplete markets and detected opportunities
//! - Scan and provider fetch latency

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Rejected raw entries counter metric name (labelled by `reason`).
pub const METRIC_ENTRIES_REJECTED: &str = "odds_entries_rejected_total";
/// Incomplete markets counter metric name.
pub const METRIC_MARKETS_INCOMPLETE: &str = "markets_incomplete_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Scans completed counter metric name.
pub const METRIC_SCANS_COMPLETED: &str = "scans_completed_total";
/// Provider fetch failures counter metric name.
pub const METRIC_FETCH_FAILURES: &str = "odds_fetch_failures_total";
/// Scan latency metric name.
pub const METRIC_SCAN_LATENCY: &str = "scan_latency_ms";
/// Provider fetch latency metric name.
pub const METRIC_FETCH_LATENCY: &str = "odds_fetch_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(METRIC_SCAN_LATENCY, "Normalize-to-report scan latency in milliseconds");
    describe_histogram!(METRIC_FETCH_LATENCY, "Odds provider fetch latency in milliseconds");

    describe_counter!(
        METRIC_ENTRIES_REJECTED,
        "Total number of raw odds entries dropped during normalization"
    );
    describe_counter!(
        METRIC_MARKETS_INCOMPLETE,
        "Total number of markets missing a required outcome"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of arbitrage opportunities detected"
    );
    describe_counter!(METRIC_SCANS_COMPLETED, "Total number of completed scans");
    describe_counter!(
        METRIC_FETCH_FAILURES,
        "Total number of polling cycles skipped after fetch failure"
    );

    debug!("Metrics initialized");
}

/// Install the Prometheus recorder and describe all metrics.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Record provider fetch latency.
pub fn record_fetch_latency(start: Instant, provider: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_FETCH_LATENCY, "provider" => provider.to_string()).record(latency_ms);
}

/// Increment fetch failures counter.
pub fn inc_fetch_failures() {
    counter!(METRIC_FETCH_FAILURES).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for a scan.
pub fn timer_scan() -> LatencyTimer {
    LatencyTimer::new(METRIC_SCAN_LATENCY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn latency_timer_measures_time() {
        let timer = LatencyTimer::new("test_metric");
        sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 9.0);
    }
}
