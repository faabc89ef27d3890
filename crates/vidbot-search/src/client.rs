//! Mirror HTTP client.
//!
//! Thin wrapper over `reqwest` with:
//! - An explicit timeout on every call (probe calls use the shorter probe timeout)
//! - Lossy UTF-8 decoding of bodies before JSON parsing
//! - Tracing spans and request metrics per operation

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, info_span, Instrument};

use crate::config::SearchConfig;
use crate::decode::{decode_page, decode_stream_info, DecodedPage, StreamInfo};
use crate::error::{SearchError, SearchResult};
use crate::metrics::record_request;
use crate::selector::BackendHandle;

/// Longest payload sample written to the log in debug mode.
const PAYLOAD_SAMPLE_CHARS: usize = 800;

/// Result-type filter sent with a search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    /// Restrict results to videos
    Videos,
    /// Relaxed filter used when the strict one returns nothing
    All,
}

impl SearchFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchFilter::Videos => "videos",
            SearchFilter::All => "all",
        }
    }
}

/// HTTP client for the mirror API.
#[derive(Clone)]
pub struct MirrorClient {
    http: Client,
    request_timeout: Duration,
    probe_timeout: Duration,
    debug_payloads: bool,
}

impl MirrorClient {
    /// Create a new client from search configuration.
    pub fn new(config: &SearchConfig) -> SearchResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("vidbot-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SearchError::Network)?;

        Ok(Self {
            http,
            request_timeout: config.request_timeout,
            probe_timeout: config.probe_timeout,
            debug_payloads: config.debug_payloads,
        })
    }

    /// Issue a cheap suggestion query against `base_url` and measure how long
    /// it takes to answer.
    pub async fn probe(&self, base_url: &str, query: &str) -> SearchResult<Duration> {
        let url = format!("{}/suggestions", base_url);
        let start = Instant::now();

        let response = self
            .http
            .get(&url)
            .query(&[("query", query)])
            .timeout(self.probe_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(status, &url, response).await);
        }
        // Drain the body so the measurement covers the full answer.
        response.bytes().await?;

        Ok(start.elapsed())
    }

    /// Fetch the first result page for `query`.
    pub async fn search_page(
        &self,
        backend: &BackendHandle,
        query: &str,
        filter: SearchFilter,
    ) -> SearchResult<DecodedPage> {
        let url = format!("{}/search", backend.base_url);
        let payload = self
            .execute_request("search", &backend.base_url, async {
                let response = self
                    .http
                    .get(&url)
                    .query(&[("q", query), ("filter", filter.as_str())])
                    .timeout(self.request_timeout)
                    .send()
                    .await?;
                self.read_json(response, &url).await
            })
            .await?;

        Ok(decode_page(&payload))
    }

    /// Fetch the page following `cursor`.
    ///
    /// The cursor is passed back exactly as the mirror returned it.
    pub async fn next_page(
        &self,
        backend: &BackendHandle,
        cursor: &Value,
    ) -> SearchResult<DecodedPage> {
        let url = format!("{}/nextpage", backend.base_url);
        let body = json!({ "nextpage": cursor });
        let payload = self
            .execute_request("next_page", &backend.base_url, async {
                let response = self
                    .http
                    .post(&url)
                    .json(&body)
                    .timeout(self.request_timeout)
                    .send()
                    .await?;
                self.read_json(response, &url).await
            })
            .await?;

        Ok(decode_page(&payload))
    }

    /// Fetch stream metadata for a single video.
    pub async fn streams(
        &self,
        backend: &BackendHandle,
        video_id: &str,
    ) -> SearchResult<StreamInfo> {
        let url = format!("{}/streams/{}", backend.base_url, video_id);
        let payload = self
            .execute_request("streams", &backend.base_url, async {
                let response = self
                    .http
                    .get(&url)
                    .timeout(self.request_timeout)
                    .send()
                    .await?;
                self.read_json(response, &url).await
            })
            .await?;

        decode_stream_info(&payload, video_id)
            .ok_or_else(|| SearchError::invalid_response(format!("{} has no title", url)))
    }

    async fn read_json(&self, response: reqwest::Response, url: &str) -> SearchResult<Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(status, url, response).await);
        }

        let bytes = response.bytes().await?;
        let text = String::from_utf8_lossy(&bytes);

        if self.debug_payloads {
            let sample: String = text.chars().take(PAYLOAD_SAMPLE_CHARS).collect();
            info!(url = %url, bytes = bytes.len(), sample = %sample, "Mirror payload");
        }

        serde_json::from_str(&text)
            .map_err(|e| SearchError::invalid_response(format!("{} returned non-JSON: {}", url, e)))
    }

    async fn execute_request<T, F>(&self, operation: &str, backend: &str, fut: F) -> SearchResult<T>
    where
        F: std::future::Future<Output = SearchResult<T>>,
    {
        let span = info_span!("mirror_request", operation = %operation, backend = %backend);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(0),
        };
        record_request(operation, status, latency_ms);
        if let Err(e) = &result {
            debug!(operation = %operation, backend = %backend, error = %e, "Mirror request failed");
        }

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: reqwest::Response) -> SearchError {
        let body = response.text().await.unwrap_or_default();
        SearchError::Status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}
