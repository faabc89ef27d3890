//! Scoped downloaded artifact.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// A downloaded file owned by one preparation job.
///
/// The file is removed when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct DownloadedArtifact {
    path: PathBuf,
    size_bytes: u64,
    format: String,
}

impl DownloadedArtifact {
    /// Take ownership of a file on disk.
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64, format: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            format: format.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Format selector of the rung that produced this file.
    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Drop for DownloadedArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove artifact"),
        }
    }
}
