//! Prometheus metrics for coinvol.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means a duplicate metric
//! name, which is a programming error that should surface on first use
//! rather than be ignored.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, register_int_gauge,
    CounterVec, Encoder, Histogram, IntCounter, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Ingestion cycles by result (ok/partial/upstream_error/marker_error).
pub static INGEST_CYCLES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "coinvol_ingest_cycles_total",
        "Total ingestion cycles by result",
        &["result"]
    )
    .unwrap()
});

/// Observations appended to the observation store.
pub static OBSERVATIONS_APPENDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "coinvol_observations_appended_total",
        "Total observations appended"
    )
    .unwrap()
});

/// Observation appends that failed after the batch marker was written.
pub static APPEND_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "coinvol_append_failures_total",
        "Total observation appends that failed after the marker write"
    )
    .unwrap()
});

/// Aggregations by outcome (written/skipped/rejected_stale/failed).
pub static AGGREGATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "coinvol_aggregations_total",
        "Total window aggregations by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Observations found in the trailing window per aggregation.
pub static AGGREGATION_WINDOW_SIZE: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "coinvol_aggregation_window_size",
        "Observations in the trailing window per aggregation",
        vec![1.0, 2.0, 5.0, 10.0, 60.0, 240.0, 720.0, 1440.0, 2880.0]
    )
    .unwrap()
});

/// Read API requests by route and result (ok/not_found/no_batch/error).
pub static READS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "coinvol_reads_total",
        "Total read API requests",
        &["route", "result"]
    )
    .unwrap()
});

/// Capture time of the current batch marker (unix seconds).
pub static BATCH_MARKER_TIME: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "coinvol_batch_marker_time",
        "Capture time of the current batch marker"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record the result of one ingestion cycle.
    pub fn ingest_cycle(result: &str) {
        INGEST_CYCLES_TOTAL.with_label_values(&[result]).inc();
    }

    /// Record appended observations.
    pub fn observations_appended(count: u64) {
        OBSERVATIONS_APPENDED_TOTAL.inc_by(count);
    }

    /// Record failed appends.
    pub fn append_failures(count: u64) {
        APPEND_FAILURES_TOTAL.inc_by(count);
    }

    /// Record one aggregation outcome.
    pub fn aggregation(outcome: &str) {
        AGGREGATIONS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record the window size seen by one aggregation.
    pub fn window_size(count: usize) {
        AGGREGATION_WINDOW_SIZE.observe(count as f64);
    }

    /// Record one read API request.
    pub fn read(route: &str, result: &str) {
        READS_TOTAL.with_label_values(&[route, result]).inc();
    }

    /// Update the batch marker gauge.
    pub fn batch_marker(time: i64) {
        BATCH_MARKER_TIME.set(time);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
