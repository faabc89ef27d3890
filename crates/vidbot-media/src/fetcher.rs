//! Artifact fetching through the format ladder.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::artifact::DownloadedArtifact;
use crate::command::{run_with_timeout, YtDlpCommand};
use crate::error::{MediaError, MediaResult};
use crate::ladder::{
    cleanup_prefix, find_newest, is_age_restricted, output_template, DEFAULT_MAX_FILESIZE,
    FORMAT_LADDER,
};
use crate::metrics::{record_attempt, record_fetch};

/// Default per-rung timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(180);

const MISSING_FILE: &str = "download finished but file is missing";
const GENERIC_FAILURE: &str = "yt-dlp download failed";

/// What to fetch and where to put it.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub source_url: String,
    pub output_dir: PathBuf,
    /// File name prefix unique to the job
    pub file_prefix: String,
}

impl FetchRequest {
    pub fn new(
        source_url: impl Into<String>,
        output_dir: impl AsRef<Path>,
        file_prefix: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            output_dir: output_dir.as_ref().to_path_buf(),
            file_prefix: file_prefix.into(),
        }
    }
}

/// Produces a local artifact for a source URL.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> MediaResult<DownloadedArtifact>;
}

/// Fetcher driving the yt-dlp binary through [`FORMAT_LADDER`].
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    program: PathBuf,
    program_args: Vec<String>,
    ladder: Vec<String>,
    max_filesize: String,
    timeout: Duration,
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            program_args: Vec::new(),
            ladder: FORMAT_LADDER.iter().map(|s| s.to_string()).collect(),
            max_filesize: DEFAULT_MAX_FILESIZE.to_string(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Run a different executable, with `args` placed before the yt-dlp arguments.
    pub fn with_program<I, S>(mut self, program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program = program.into();
        self.program_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the format ladder.
    pub fn with_ladder<I, S>(mut self, ladder: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ladder = ladder.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_filesize(mut self, size: impl Into<String>) -> Self {
        self.max_filesize = size.into();
        self
    }

    /// Set the per-rung timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the executable on PATH.
    pub fn check_available(&self) -> MediaResult<PathBuf> {
        which::which(&self.program).map_err(|_| MediaError::YtDlpNotFound)
    }

    async fn try_rung(
        &self,
        request: &FetchRequest,
        format: &str,
    ) -> MediaResult<DownloadedArtifact> {
        cleanup_prefix(&request.output_dir, &request.file_prefix).await?;

        let template = output_template(&request.output_dir, &request.file_prefix);
        let cmd = YtDlpCommand::new(&request.source_url, &template)
            .format(format)
            .max_filesize(&self.max_filesize);

        let mut args: Vec<std::ffi::OsString> =
            self.program_args.iter().map(Into::into).collect();
        args.extend(cmd.build_args());

        let output = run_with_timeout(&self.program, args, self.timeout).await?;

        if !output.success {
            let combined = format!("{}\n{}", output.stderr, output.stdout);
            let message = output.last_error_line().unwrap_or(GENERIC_FAILURE).to_string();
            if is_age_restricted(&combined) {
                return Err(MediaError::age_restricted(message));
            }
            return Err(MediaError::download_failed(message));
        }

        let path = find_newest(&request.output_dir, &request.file_prefix)
            .await?
            .ok_or_else(|| MediaError::download_failed(MISSING_FILE))?;
        let size_bytes = tokio::fs::metadata(&path).await?.len();

        Ok(DownloadedArtifact::new(path, size_bytes, format))
    }
}

#[async_trait]
impl ArtifactFetcher for YtDlpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> MediaResult<DownloadedArtifact> {
        self.check_available()?;
        tokio::fs::create_dir_all(&request.output_dir).await?;

        let start = Instant::now();
        let mut last_error = MediaError::download_failed(GENERIC_FAILURE);

        for (idx, format) in self.ladder.iter().enumerate() {
            let rung = idx + 1;
            debug!(
                source = %request.source_url,
                rung,
                format = %format,
                "Trying format"
            );

            match self.try_rung(request, format).await {
                Ok(artifact) => {
                    record_attempt(rung, "ok");
                    record_fetch(true, start.elapsed().as_secs_f64());
                    info!(
                        source = %request.source_url,
                        rung,
                        format = %format,
                        size_bytes = artifact.size_bytes(),
                        "Fetched artifact"
                    );
                    return Ok(artifact);
                }
                Err(e) if e.is_age_restricted() => {
                    // No format will get past an age gate.
                    record_attempt(rung, "age_restricted");
                    record_fetch(false, start.elapsed().as_secs_f64());
                    warn!(source = %request.source_url, error = %e, "Source is age-restricted");
                    return Err(e);
                }
                Err(e) => {
                    record_attempt(rung, "failed");
                    warn!(
                        source = %request.source_url,
                        rung,
                        format = %format,
                        error = %e,
                        "Format attempt failed"
                    );
                    last_error = e;
                }
            }
        }

        let _ = cleanup_prefix(&request.output_dir, &request.file_prefix).await;
        record_fetch(false, start.elapsed().as_secs_f64());
        Err(last_error)
    }
}
