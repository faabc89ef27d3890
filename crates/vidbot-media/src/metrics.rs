//! Fetch metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Fetch attempts by ladder rung and result.
    pub const FETCH_ATTEMPTS_TOTAL: &str = "fetch_attempts_total";

    /// Wall-clock time of a whole ladder run in seconds.
    pub const FETCH_DURATION_SECONDS: &str = "fetch_duration_seconds";
}

/// Record a single rung attempt.
pub fn record_attempt(rung: usize, result: &str) {
    counter!(
        names::FETCH_ATTEMPTS_TOTAL,
        "rung" => rung.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record a finished ladder run.
pub fn record_fetch(success: bool, duration_secs: f64) {
    histogram!(
        names::FETCH_DURATION_SECONDS,
        "success" => success.to_string()
    )
    .record(duration_secs);
}
