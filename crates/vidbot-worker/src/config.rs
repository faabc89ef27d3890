//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use vidbot_models::DEFAULT_SHORT_FORM_SECONDS;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrently running preparations
    pub max_concurrent_jobs: usize,
    /// Directory the fetch tool writes into
    pub download_dir: PathBuf,
    /// Longest clip accepted, in seconds
    pub max_clip_seconds: u64,
    /// Timeout for a single fetch attempt
    pub fetch_timeout: Duration,
    /// Size ceiling passed to the fetch tool
    pub max_filesize: String,
    /// Session token lifetime in seconds
    pub token_ttl_seconds: u64,
    /// Lifetime of cached inline candidates
    pub candidate_cache_ttl: Duration,
    /// Results requested per search
    pub max_search_results: usize,
    /// Results shown per inline answer
    pub max_inline_results: usize,
    /// JSONL file backing the local media library
    pub library_path: PathBuf,
    /// Directory delivered artifacts are copied into
    pub outbox_dir: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            download_dir: PathBuf::from("/tmp/vid_robot"),
            max_clip_seconds: DEFAULT_SHORT_FORM_SECONDS,
            fetch_timeout: Duration::from_secs(180),
            max_filesize: "49M".to_string(),
            token_ttl_seconds: 3600,
            candidate_cache_ttl: Duration::from_secs(600),
            max_search_results: 5,
            max_inline_results: 10,
            library_path: PathBuf::from("./data/library.jsonl"),
            outbox_dir: PathBuf::from("./data/outbox"),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_concurrent_jobs: std::env::var("MAX_CONCURRENT_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            download_dir: std::env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            max_clip_seconds: std::env::var("MAX_CLIP_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_clip_seconds),
            fetch_timeout: Duration::from_secs(
                std::env::var("FETCH_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(180),
            ),
            max_filesize: std::env::var("MAX_FILESIZE").unwrap_or(defaults.max_filesize),
            token_ttl_seconds: std::env::var("PM_TOKEN_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.token_ttl_seconds),
            candidate_cache_ttl: Duration::from_secs(
                std::env::var("CANDIDATE_CACHE_TTL_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            max_search_results: std::env::var("MAX_YT_RESULTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_search_results),
            max_inline_results: std::env::var("MAX_INLINE_RESULTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_inline_results),
            library_path: std::env::var("LIBRARY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.library_path),
            outbox_dir: std::env::var("OUTBOX_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.outbox_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "MAX_CONCURRENT_JOBS",
        "DOWNLOAD_DIR",
        "MAX_CLIP_SECONDS",
        "FETCH_TIMEOUT_SECONDS",
        "MAX_FILESIZE",
        "PM_TOKEN_TTL_SECONDS",
        "CANDIDATE_CACHE_TTL_SECONDS",
        "MAX_YT_RESULTS",
        "MAX_INLINE_RESULTS",
        "LIBRARY_PATH",
        "OUTBOX_DIR",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        let config = WorkerConfig::from_env();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.download_dir, PathBuf::from("/tmp/vid_robot"));
        assert_eq!(config.max_filesize, "49M");
        assert_eq!(config.token_ttl_seconds, 3600);
        assert_eq!(config.candidate_cache_ttl, Duration::from_secs(600));
    }

    #[test]
    #[serial]
    fn test_env_overrides_and_rejects_zero_concurrency() {
        clear_env();
        std::env::set_var("MAX_CONCURRENT_JOBS", "0");
        std::env::set_var("MAX_CLIP_SECONDS", "90");
        std::env::set_var("DOWNLOAD_DIR", "/var/tmp/clips");

        let config = WorkerConfig::from_env();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.max_clip_seconds, 90);
        assert_eq!(config.download_dir, PathBuf::from("/var/tmp/clips"));
        clear_env();
    }
}
