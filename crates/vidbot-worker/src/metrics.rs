//! Preparation metrics.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Metric name constants for consistency.
pub mod names {
    /// Admission decisions by result (admitted / rejected).
    pub const ADMISSIONS_TOTAL: &str = "preparation_admissions_total";

    /// Finished jobs by outcome label.
    pub const JOBS_TOTAL: &str = "preparation_jobs_total";

    /// Job wall-clock time in seconds, permit wait included.
    pub const JOB_DURATION_SECONDS: &str = "preparation_job_duration_seconds";

    /// Jobs currently holding a dedup key.
    pub const JOBS_IN_FLIGHT: &str = "preparation_jobs_in_flight";
}

/// Serve Prometheus metrics on `addr`.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    Ok(())
}

pub fn record_admission(admitted: bool) {
    let result = if admitted { "admitted" } else { "rejected" };
    counter!(names::ADMISSIONS_TOTAL, "result" => result).increment(1);
}

pub fn record_job(outcome: &str, duration_secs: f64) {
    counter!(names::JOBS_TOTAL, "outcome" => outcome.to_string()).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "outcome" => outcome.to_string()).record(duration_secs);
}

pub fn set_in_flight(count: usize) {
    gauge!(names::JOBS_IN_FLIGHT).set(count as f64);
}
