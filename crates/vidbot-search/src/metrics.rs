//! Search metrics collection.
//!
//! - Mirror requests by operation and status
//! - Request and probe latency histograms
//! - Result counts per search

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total mirror requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "mirror_requests_total";

    /// Mirror request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "mirror_latency_seconds";

    /// Probe latency in seconds by backend and outcome.
    pub const PROBE_SECONDS: &str = "mirror_probe_seconds";

    /// Candidates returned per search call.
    pub const SEARCH_RESULTS: &str = "search_results";

    /// Searches that fell back to the relaxed filter.
    pub const FALLBACKS_TOTAL: &str = "search_fallbacks_total";
}

/// Record metrics for a completed mirror request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a single backend probe.
pub fn record_probe(backend: &str, ok: bool, latency_ms: f64) {
    histogram!(
        names::PROBE_SECONDS,
        "backend" => backend.to_string(),
        "ok" => ok.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record the size of a finished search.
pub fn record_search(results: usize, fell_back: bool) {
    histogram!(names::SEARCH_RESULTS).record(results as f64);
    if fell_back {
        counter!(names::FALLBACKS_TOTAL).increment(1);
    }
}
