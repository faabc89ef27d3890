//! Structured job logging and subscriber setup.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vidbot_models::JobId;

/// Install the global tracing subscriber.
///
/// `LOG_FORMAT=json` selects JSON lines; otherwise coloured text.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    // Target prefix match covers every vidbot_* crate.
    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "vidbot=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Logs the lifecycle of one preparation job with its id and source attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    external_id: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, external_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            external_id: external_id.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            external_id = %self.external_id,
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            external_id = %self.external_id,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            external_id = %self.external_id,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            external_id = %self.external_id,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            external_id = %self.external_id,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span carrying the job fields, for instrumenting the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "preparation",
            job_id = %self.job_id,
            external_id = %self.external_id
        )
    }
}
