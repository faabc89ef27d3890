//! Media fetching for the preparation pipeline.
//!
//! This crate provides:
//! - A yt-dlp command builder and a runner with a hard timeout
//! - The format fallback ladder with per-job file prefixes
//! - [`DownloadedArtifact`], a file that is deleted when dropped
//! - FFprobe inspection of prepared artifacts

pub mod artifact;
pub mod command;
pub mod error;
pub mod fetcher;
pub mod ladder;
pub mod metrics;
pub mod probe;

pub use artifact::DownloadedArtifact;
pub use command::{run_with_timeout, ProcessOutput, YtDlpCommand};
pub use error::{MediaError, MediaResult};
pub use fetcher::{ArtifactFetcher, FetchRequest, YtDlpFetcher};
pub use ladder::{is_age_restricted, DEFAULT_MAX_FILESIZE, FORMAT_LADDER};
pub use probe::{probe_video, VideoInfo};
