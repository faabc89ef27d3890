//! The preparation pipeline for a single admitted job.
//!
//! Pre-flight checks, ladder fetch, delivery, then library bookkeeping.
//! Every path ends in a [`PreparationOutcome`]; nothing is propagated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn, Instrument};

use vidbot_media::{ArtifactFetcher, FetchRequest, MediaError};
use vidbot_models::{
    truncate_text, ArtifactMetadata, FailureKind, PreparationJob, PreparationOutcome,
};

use crate::collaborators::{Delivery, MediaLibrary};
use crate::logging::JobLogger;

/// Longest caption handed to delivery.
const MAX_CAPTION_CHARS: usize = 200;

/// A job's fetch directory, removed with its contents when dropped.
///
/// Dropping also runs while a panicking job unwinds.
struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed work dir"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove work dir"),
        }
    }
}

/// Requester-facing message naming the configured clip ceiling.
fn too_long_message(max_clip_seconds: u64) -> String {
    let limit = match max_clip_seconds {
        60 => "1 minute".to_string(),
        s if s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{} seconds", s),
    };
    format!("The video is longer than {}, pick another one.", limit)
}

/// Runs one job from pre-flight checks to a stored record.
pub struct Preparer {
    fetcher: Arc<dyn ArtifactFetcher>,
    library: Arc<dyn MediaLibrary>,
    delivery: Arc<dyn Delivery>,
    download_dir: PathBuf,
    max_clip_seconds: u64,
}

impl Preparer {
    pub fn new(
        fetcher: Arc<dyn ArtifactFetcher>,
        library: Arc<dyn MediaLibrary>,
        delivery: Arc<dyn Delivery>,
        download_dir: impl Into<PathBuf>,
        max_clip_seconds: u64,
    ) -> Self {
        Self {
            fetcher,
            library,
            delivery,
            download_dir: download_dir.into(),
            max_clip_seconds,
        }
    }

    /// Run the job to completion.
    pub async fn run(&self, job: PreparationJob) -> PreparationOutcome {
        let logger = JobLogger::new(&job.job_id, &job.external_id);
        let span = logger.create_span();
        self.run_inner(&job, &logger).instrument(span).await
    }

    async fn run_inner(&self, job: &PreparationJob, logger: &JobLogger) -> PreparationOutcome {
        logger.log_start(&job.source_url);

        if let Some(duration) = job.known_duration() {
            if duration > self.max_clip_seconds {
                logger.log_warning(&format!(
                    "duration {}s exceeds {}s",
                    duration, self.max_clip_seconds
                ));
                return PreparationOutcome::failure_with(
                    FailureKind::TooLong,
                    too_long_message(self.max_clip_seconds),
                );
            }
        }

        match self.library.is_blocked(&job.external_id, &job.source_url).await {
            Ok(true) => {
                logger.log_warning("source is blocked");
                return PreparationOutcome::failure(FailureKind::Blocked);
            }
            Ok(false) => {}
            Err(e) => {
                logger.log_error(&format!("block check failed: {}", e));
                return PreparationOutcome::failure(FailureKind::Internal);
            }
        }

        // Each job writes into its own directory so equal prefixes from
        // different requesters never collide.
        let work_dir = WorkDir::new(self.download_dir.join(job.job_id.as_str()));
        let request = FetchRequest::new(&job.source_url, work_dir.path(), job.file_prefix());

        self.fetch_and_deliver(job, &request, logger).await
    }

    async fn fetch_and_deliver(
        &self,
        job: &PreparationJob,
        request: &FetchRequest,
        logger: &JobLogger,
    ) -> PreparationOutcome {
        let artifact = match self.fetcher.fetch(request).await {
            Ok(artifact) => artifact,
            Err(MediaError::AgeRestricted { message }) => {
                logger.log_warning(&format!("age-restricted: {}", message));
                return PreparationOutcome::failure(FailureKind::AgeRestricted);
            }
            Err(e) => {
                logger.log_error(&format!("fetch failed: {}", e));
                return PreparationOutcome::failure(FailureKind::DownloadFailed);
            }
        };
        logger.log_progress(&format!(
            "fetched {} bytes with format {}",
            artifact.size_bytes(),
            artifact.format()
        ));

        let caption = truncate_text(job.title(), MAX_CAPTION_CHARS);
        let delivered = self
            .delivery
            .deliver(job.requester, artifact.path(), &caption)
            .await;
        // The local file is gone from here on, whatever delivery did.
        drop(artifact);

        let media = match delivered {
            Ok(media) => media,
            Err(e) => {
                logger.log_error(&format!("delivery failed: {}", e));
                return PreparationOutcome::failure(FailureKind::DeliveryFailed);
            }
        };

        let metadata = ArtifactMetadata::from_delivery(
            media,
            &job.external_id,
            &job.source_url,
            job.title(),
            job.candidate.as_ref().and_then(|c| c.thumbnail_url.clone()),
            job.requester,
        );

        let record_id = match self.library.create_record(&metadata).await {
            Ok(id) => id,
            Err(e) => {
                logger.log_error(&format!("create_record failed: {}", e));
                return PreparationOutcome::failure(FailureKind::Internal);
            }
        };

        if let Some(query_norm) = job.query_norm.as_deref() {
            if let Err(e) = self.library.link_query(query_norm, record_id).await {
                logger.log_warning(&format!("link_query failed: {}", e));
            }
        }

        logger.log_completion(&format!("record {}", record_id));
        PreparationOutcome::Success {
            metadata,
            record_id,
        }
    }
}
