//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while fetching or inspecting media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Source is age-restricted: {message}")]
    AgeRestricted { message: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),
}

impl MediaError {
    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create an age-restriction error.
    pub fn age_restricted(message: impl Into<String>) -> Self {
        Self::AgeRestricted {
            message: message.into(),
        }
    }

    pub fn is_age_restricted(&self) -> bool {
        matches!(self, MediaError::AgeRestricted { .. })
    }

    /// Check if trying again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MediaError::DownloadFailed { .. } | MediaError::Timeout(_) | MediaError::Io(_)
        )
    }
}
