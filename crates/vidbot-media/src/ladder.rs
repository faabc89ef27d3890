//! Format fallback ladder and per-job output files.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Format selectors tried in order until one produces a file.
///
/// Merged streams at decreasing heights first, then single-file formats,
/// then anything yt-dlp can produce.
pub const FORMAT_LADDER: &[&str] = &[
    "bestvideo[height<=720]+bestaudio/best[height<=720]",
    "bestvideo[height<=480]+bestaudio/best[height<=480]",
    "bestvideo[height<=360]+bestaudio/best[height<=360]",
    "best[height<=720]",
    "best[height<=480]",
    "best[height<=360]",
    "best",
];

/// Size ceiling passed to every rung.
pub const DEFAULT_MAX_FILESIZE: &str = "49M";

/// Phrases the fetch tool prints when a source needs age or consent checks.
const AGE_RESTRICTED_MARKERS: &[&str] = &[
    "sign in to confirm your age",
    "age-restricted",
    "age restricted",
];

/// Check fetch-tool output for an age/consent restriction.
pub fn is_age_restricted(text: &str) -> bool {
    let lowered = text.to_lowercase();
    AGE_RESTRICTED_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Output template for a job: `<dir>/<prefix>.%(ext)s`.
pub fn output_template(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{}.%(ext)s", prefix))
}

fn matches_prefix(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix(prefix))
        .is_some_and(|rest| rest.starts_with('.'))
}

/// Remove every `<prefix>.*` file in `dir`. Returns how many were removed.
pub async fn cleanup_prefix(dir: &Path, prefix: &str) -> std::io::Result<usize> {
    let mut removed = 0;
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !matches_prefix(&path, prefix) {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed stale artifact");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    Ok(removed)
}

/// Most recently modified `<prefix>.*` file in `dir`.
pub async fn find_newest(dir: &Path, prefix: &str) -> std::io::Result<Option<PathBuf>> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !matches_prefix(&path, prefix) {
            continue;
        }
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, p)| p))
}
