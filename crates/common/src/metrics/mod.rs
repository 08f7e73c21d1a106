//! Metrics and observability utilities
//!
//! Prometheus-style counters and histograms for turns, source hits,
//! upstream failures and ledger publication.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all astrolit metrics
pub const METRICS_PREFIX: &str = "astrolit";

/// Histogram buckets (seconds) for one turn's retrieval. A turn spans a
/// corpus scan, the keyword fan-out and one full-text download per hit, so
/// the range runs well past the per-request timeout.
pub const RETRIEVAL_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0];

/// Name of the retrieval latency histogram
pub fn retrieval_duration_metric() -> String {
    format!("{}_retrieval_duration_seconds", METRICS_PREFIX)
}

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_turns_total", METRICS_PREFIX),
        Unit::Count,
        "Total conversation turns processed"
    );

    describe_counter!(
        format!("{}_source_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Selected hits per source provenance"
    );

    describe_counter!(
        format!("{}_upstream_failures_total", METRICS_PREFIX),
        Unit::Count,
        "External source failures degraded to empty results"
    );

    describe_counter!(
        format!("{}_sources_published_total", METRICS_PREFIX),
        Unit::Count,
        "Newly discovered sources published by the ledger"
    );

    describe_histogram!(
        retrieval_duration_metric(),
        Unit::Seconds,
        "Fan-out retrieval latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to time one retrieval fan-out
pub struct RetrievalTimer {
    start: Instant,
}

impl RetrievalTimer {
    /// Start timing
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Record the elapsed time
    pub fn finish(self) {
        histogram!(retrieval_duration_metric())
            .record(self.start.elapsed().as_secs_f64());
    }
}

/// Record a processed turn
pub fn record_turn(used_context: bool) {
    let mode = if used_context { "followup" } else { "new_topic" };
    counter!(
        format!("{}_turns_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);
}

/// Record selected hits for one provenance
pub fn record_source_hits(provenance: &str, count: usize) {
    counter!(
        format!("{}_source_hits_total", METRICS_PREFIX),
        "provenance" => provenance.to_string()
    )
    .increment(count as u64);
}

/// Record an external source failure
pub fn record_upstream_failure(service: &str) {
    counter!(
        format!("{}_upstream_failures_total", METRICS_PREFIX),
        "service" => service.to_string()
    )
    .increment(1);
}

/// Record sources published by the ledger
pub fn record_sources_published(count: usize) {
    counter!(format!("{}_sources_published_total", METRICS_PREFIX)).increment(count as u64);
}
