//! Latency-based backend selection.
//!
//! All configured mirrors are probed concurrently with a cheap suggestion
//! query; the fastest one that answers is cached and reused by every later
//! search until [`BackendSelector::refresh`] or [`BackendSelector::invalidate`]
//! is called. A search failing on the chosen mirror does not trigger a
//! re-probe.

use std::time::Duration;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::MirrorClient;
use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::metrics::record_probe;

/// A configured mirror and the latency of its most recent probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub base_url: String,
    /// `None` until probed, or when the last probe failed
    pub last_measured_latency: Option<Duration>,
}

/// The mirror chosen for searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendHandle {
    pub base_url: String,
    /// Probe latency that won the selection
    pub latency: Duration,
}

/// Index of the lowest latency among successful probes.
///
/// Ties go to the earlier entry, so configuration order breaks ties.
pub fn pick_fastest(latencies: &[Option<Duration>]) -> Option<usize> {
    let mut best: Option<(usize, Duration)> = None;
    for (idx, latency) in latencies.iter().enumerate() {
        let Some(latency) = latency else { continue };
        match best {
            Some((_, current)) if *latency >= current => {}
            _ => best = Some((idx, *latency)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Probes mirrors and caches the fastest one.
pub struct BackendSelector {
    client: MirrorClient,
    probe_query: String,
    probe_timeout: Duration,
    backends: RwLock<Vec<Backend>>,
    current: RwLock<Option<BackendHandle>>,
}

impl BackendSelector {
    /// Create a selector over the mirrors in `config`.
    pub fn new(config: &SearchConfig, client: MirrorClient) -> SearchResult<Self> {
        let backends = config
            .endpoints()?
            .into_iter()
            .map(|base_url| Backend {
                base_url,
                last_measured_latency: None,
            })
            .collect();

        Ok(Self {
            client,
            probe_query: config.probe_query.clone(),
            probe_timeout: config.probe_timeout,
            backends: RwLock::new(backends),
            current: RwLock::new(None),
        })
    }

    /// Return the cached backend, probing all mirrors if none is cached.
    ///
    /// Concurrent callers share a single probe round.
    pub async fn select(&self) -> SearchResult<BackendHandle> {
        {
            let current = self.current.read().await;
            if let Some(handle) = current.as_ref() {
                return Ok(handle.clone());
            }
        }

        let mut current = self.current.write().await;

        // Another task may have probed while we waited for the lock.
        if let Some(handle) = current.as_ref() {
            return Ok(handle.clone());
        }

        let handle = self.probe_all().await?;
        *current = Some(handle.clone());
        Ok(handle)
    }

    /// Re-probe all mirrors and replace the cached choice.
    ///
    /// When every probe fails the previous choice is kept and
    /// [`SearchError::BackendUnavailable`] is returned.
    pub async fn refresh(&self) -> SearchResult<BackendHandle> {
        let mut current = self.current.write().await;
        let handle = self.probe_all().await?;
        *current = Some(handle.clone());
        Ok(handle)
    }

    /// The cached choice, without probing.
    pub async fn current(&self) -> Option<BackendHandle> {
        self.current.read().await.clone()
    }

    /// Drop the cached choice so the next `select` probes again.
    pub async fn invalidate(&self) {
        let mut current = self.current.write().await;
        *current = None;
    }

    /// Snapshot of configured mirrors with their last probe latency.
    pub async fn backends(&self) -> Vec<Backend> {
        self.backends.read().await.clone()
    }

    async fn probe_all(&self) -> SearchResult<BackendHandle> {
        let urls: Vec<String> = self
            .backends
            .read()
            .await
            .iter()
            .map(|b| b.base_url.clone())
            .collect();

        let probes = urls.iter().map(|url| self.probe_one(url));
        let latencies = join_all(probes).await;

        {
            let mut backends = self.backends.write().await;
            for (backend, latency) in backends.iter_mut().zip(latencies.iter()) {
                backend.last_measured_latency = *latency;
            }
        }

        match pick_fastest(&latencies) {
            Some(idx) => {
                let handle = BackendHandle {
                    base_url: urls[idx].clone(),
                    latency: latencies[idx].unwrap_or_default(),
                };
                info!(
                    backend = %handle.base_url,
                    latency_ms = handle.latency.as_millis() as u64,
                    candidates = urls.len(),
                    "Selected search backend"
                );
                Ok(handle)
            }
            None => {
                warn!(candidates = urls.len(), "No search backend answered the probe");
                Err(SearchError::backend_unavailable(format!(
                    "all {} mirrors failed the probe",
                    urls.len()
                )))
            }
        }
    }

    async fn probe_one(&self, base_url: &str) -> Option<Duration> {
        let result = tokio::time::timeout(
            self.probe_timeout,
            self.client.probe(base_url, &self.probe_query),
        )
        .await;

        match result {
            Ok(Ok(latency)) => {
                debug!(backend = %base_url, latency_ms = latency.as_millis() as u64, "Probe succeeded");
                record_probe(base_url, true, latency.as_millis() as f64);
                Some(latency)
            }
            Ok(Err(e)) => {
                debug!(backend = %base_url, error = %e, "Probe failed");
                record_probe(base_url, false, self.probe_timeout.as_millis() as f64);
                None
            }
            Err(_) => {
                debug!(backend = %base_url, "Probe timed out");
                record_probe(base_url, false, self.probe_timeout.as_millis() as f64);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Option<Duration> {
        Some(Duration::from_millis(v))
    }

    #[test]
    fn test_pick_fastest_lowest_wins() {
        assert_eq!(pick_fastest(&[ms(300), ms(120), ms(200)]), Some(1));
    }

    #[test]
    fn test_pick_fastest_skips_failures() {
        assert_eq!(pick_fastest(&[None, ms(500), None]), Some(1));
    }

    #[test]
    fn test_pick_fastest_tie_goes_to_first() {
        assert_eq!(pick_fastest(&[ms(100), ms(100)]), Some(0));
    }

    #[test]
    fn test_pick_fastest_none_answered() {
        assert_eq!(pick_fastest(&[None, None]), None);
        assert_eq!(pick_fastest(&[]), None);
    }

    #[tokio::test]
    async fn test_new_lists_backends_in_config_order() {
        let config = SearchConfig::new("http://a.local/").with_fallbacks(["http://b.local"]);
        let client = MirrorClient::new(&config).unwrap();
        let selector = BackendSelector::new(&config, client).unwrap();

        let backends = selector.backends().await;
        assert_eq!(backends.len(), 2);
        assert_eq!(backends[0].base_url, "http://a.local");
        assert!(backends.iter().all(|b| b.last_measured_latency.is_none()));
        assert!(selector.current().await.is_none());
    }
}
