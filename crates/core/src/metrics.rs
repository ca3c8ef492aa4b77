//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Transfers (outcomes, bytes, durations, in-flight slots)
//! - Validation rejections
//! - Sessions

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Transfers
// =============================================================================

/// Finished transfers by result.
pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediaflow_uploads_total", "Total finished upload attempts"),
        &["result"], // "completed", "failed", "aborted"
    )
    .unwrap()
});

/// Bytes of successfully uploaded items.
pub static UPLOAD_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediaflow_upload_bytes_total",
        "Total bytes of successfully uploaded items",
    )
    .unwrap()
});

/// Transfer duration in seconds.
pub static UPLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediaflow_upload_duration_seconds",
            "Duration of a single item transfer",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

/// Transfers currently occupying a pool slot.
pub static UPLOADS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediaflow_uploads_in_flight",
        "Number of transfers currently in flight",
    )
    .unwrap()
});

// =============================================================================
// Validation
// =============================================================================

/// Files refused before reaching the queue.
pub static VALIDATION_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediaflow_validation_rejections_total",
            "Files rejected by validation",
        ),
        &["reason"], // "unsupported_type", "too_large", "queue_full"
    )
    .unwrap()
});

// =============================================================================
// Sessions
// =============================================================================

/// Sessions that ended, by outcome.
pub static SESSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediaflow_sessions_total", "Total upload sessions ended"),
        &["outcome"], // "finished", "cancelled"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(UPLOADS_TOTAL.clone()),
        Box::new(UPLOAD_BYTES.clone()),
        Box::new(UPLOAD_DURATION.clone()),
        Box::new(UPLOADS_IN_FLIGHT.clone()),
        Box::new(VALIDATION_REJECTIONS.clone()),
        Box::new(SESSIONS_TOTAL.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        UPLOADS_TOTAL.with_label_values(&["completed"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "mediaflow_uploads_total"));
    }
}
