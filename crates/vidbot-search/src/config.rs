//! Search configuration.

use std::time::Duration;

use url::Url;

use crate::error::{SearchError, SearchResult};

/// Mirror search configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Primary mirror base URL
    pub primary_url: String,
    /// Fallback mirror base URLs, probed alongside the primary
    pub fallback_urls: Vec<String>,
    /// Timeout for a real search or page request
    pub request_timeout: Duration,
    /// Timeout for a single latency probe
    pub probe_timeout: Duration,
    /// Query sent to the suggestion endpoint when probing
    pub probe_query: String,
    /// Upper bound on pages fetched per search
    pub max_pages: usize,
    /// Log payload samples at info level
    pub debug_payloads: bool,
}

impl SearchConfig {
    /// Create a config for a single mirror with default timeouts.
    pub fn new(primary_url: impl Into<String>) -> Self {
        Self {
            primary_url: primary_url.into(),
            fallback_urls: Vec::new(),
            request_timeout: Duration::from_secs(4),
            probe_timeout: Duration::from_secs(3),
            probe_query: "test".to_string(),
            max_pages: 5,
            debug_payloads: false,
        }
    }

    /// Add fallback mirrors.
    pub fn with_fallbacks<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_urls.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> SearchResult<Self> {
        let primary_url = std::env::var("PIPED_API_BASE_URL")
            .map_err(|_| SearchError::config("PIPED_API_BASE_URL must be set"))?;

        if primary_url.trim().is_empty() {
            return Err(SearchError::config("PIPED_API_BASE_URL cannot be empty"));
        }

        let fallback_urls = std::env::var("PIPED_FALLBACK_URLS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let request_timeout_secs: f64 = std::env::var("PIPED_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4.0);

        let probe_timeout_secs: f64 = std::env::var("PIPED_PROBE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3.0);

        let config = Self {
            primary_url: primary_url.trim().to_string(),
            fallback_urls,
            request_timeout: Duration::from_secs_f64(request_timeout_secs.max(0.1)),
            probe_timeout: Duration::from_secs_f64(probe_timeout_secs.max(0.1)),
            probe_query: std::env::var("PIPED_PROBE_QUERY").unwrap_or_else(|_| "test".to_string()),
            max_pages: std::env::var("PIPED_MAX_PAGES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            debug_payloads: std::env::var("PIPED_DEBUG")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"))
                .unwrap_or(false),
        };

        config.endpoints()?;
        Ok(config)
    }

    /// All mirror base URLs in probe order: primary first, then fallbacks,
    /// without trailing slashes or duplicates.
    pub fn endpoints(&self) -> SearchResult<Vec<String>> {
        let mut endpoints: Vec<String> = Vec::new();
        for raw in std::iter::once(&self.primary_url).chain(self.fallback_urls.iter()) {
            let trimmed = raw.trim().trim_end_matches('/');
            Url::parse(trimmed)
                .map_err(|e| SearchError::config(format!("invalid mirror URL {}: {}", raw, e)))?;
            if !endpoints.iter().any(|e| e == trimmed) {
                endpoints.push(trimmed.to_string());
            }
        }
        Ok(endpoints)
    }
}
