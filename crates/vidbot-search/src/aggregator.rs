//! Search aggregation over the selected mirror.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use vidbot_models::SearchCandidate;

use crate::client::{MirrorClient, SearchFilter};
use crate::config::SearchConfig;
use crate::decode::{DecodedPage, StreamInfo};
use crate::error::SearchResult;
use crate::metrics::record_search;
use crate::selector::{BackendHandle, BackendSelector};

/// Runs a query against the selected mirror, following cursors until the
/// requested number of unique candidates is collected.
#[derive(Clone)]
pub struct SearchAggregator {
    selector: Arc<BackendSelector>,
    client: MirrorClient,
    max_pages: usize,
}

impl SearchAggregator {
    pub fn new(selector: Arc<BackendSelector>, client: MirrorClient, max_pages: usize) -> Self {
        Self {
            selector,
            client,
            max_pages: max_pages.max(1),
        }
    }

    /// Build the client, selector and aggregator from configuration.
    pub fn from_config(config: &SearchConfig) -> SearchResult<Self> {
        let client = MirrorClient::new(config)?;
        let selector = Arc::new(BackendSelector::new(config, client.clone())?);
        Ok(Self::new(selector, client, config.max_pages))
    }

    /// The backend selector shared by this aggregator.
    pub fn selector(&self) -> &Arc<BackendSelector> {
        &self.selector
    }

    /// Search for up to `limit` unique candidates.
    ///
    /// Ranks are renumbered 1..=n across merged pages. If the default video
    /// filter yields nothing, the query is rerun once with the relaxed filter.
    /// "No results" is an empty vector, never an error.
    pub async fn search(&self, query: &str, limit: usize) -> SearchResult<Vec<SearchCandidate>> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let backend = self.selector.select().await?;

        let mut results = self.collect(&backend, query, limit, SearchFilter::Videos).await?;
        let fell_back = results.is_empty();
        if fell_back {
            debug!(query = %query, "No video results, retrying with relaxed filter");
            results = self.collect(&backend, query, limit, SearchFilter::All).await?;
        }

        record_search(results.len(), fell_back);
        info!(
            query = %query,
            backend = %backend.base_url,
            results = results.len(),
            fell_back,
            "Search completed"
        );

        Ok(results)
    }

    /// Search, degrading any backend failure to an empty list.
    pub async fn search_or_empty(&self, query: &str, limit: usize) -> Vec<SearchCandidate> {
        match self.search(query, limit).await {
            Ok(results) => results,
            Err(e) => {
                warn!(query = %query, error = %e, retryable = e.is_retryable(), "Search failed, returning no results");
                Vec::new()
            }
        }
    }

    /// Metadata for a single video from the selected mirror.
    pub async fn stream_info(&self, video_id: &str) -> SearchResult<StreamInfo> {
        let backend = self.selector.select().await?;
        self.client.streams(&backend, video_id).await
    }

    async fn collect(
        &self,
        backend: &BackendHandle,
        query: &str,
        limit: usize,
        filter: SearchFilter,
    ) -> SearchResult<Vec<SearchCandidate>> {
        let mut merged = Merged::new(limit);

        let mut page = self.client.search_page(backend, query, filter).await?;
        let mut pages = 1;

        loop {
            let DecodedPage {
                candidates,
                next_cursor,
            } = page;
            merged.extend(candidates);

            if merged.is_full() || pages >= self.max_pages {
                break;
            }
            let Some(cursor) = next_cursor else { break };

            page = self.client.next_page(backend, &cursor).await?;
            pages += 1;
        }

        debug!(
            query = %query,
            filter = filter.as_str(),
            pages,
            results = merged.items.len(),
            "Collected search pages"
        );

        Ok(merged.items)
    }
}

/// Accumulates unique candidates in arrival order up to a limit.
struct Merged {
    limit: usize,
    seen: HashSet<String>,
    items: Vec<SearchCandidate>,
}

impl Merged {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            seen: HashSet::new(),
            items: Vec::with_capacity(limit.min(64)),
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    fn extend(&mut self, candidates: Vec<SearchCandidate>) {
        for candidate in candidates {
            if self.is_full() {
                return;
            }
            if !self.seen.insert(candidate.external_id.clone()) {
                continue;
            }
            let rank = self.items.len() as u32 + 1;
            self.items.push(candidate.reranked(rank));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, rank: u32) -> SearchCandidate {
        SearchCandidate::new(id, format!("title {}", id), rank)
    }

    #[test]
    fn test_merged_dedups_and_renumbers() {
        let mut merged = Merged::new(10);
        merged.extend(vec![candidate("a", 1), candidate("b", 2)]);
        merged.extend(vec![candidate("b", 1), candidate("c", 2)]);

        let ids: Vec<_> = merged.items.iter().map(|c| c.external_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        let ranks: Vec<_> = merged.items.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, [1, 2, 3]);
    }

    #[test]
    fn test_merged_respects_limit() {
        let mut merged = Merged::new(2);
        merged.extend(vec![candidate("a", 1), candidate("b", 2), candidate("c", 3)]);
        assert!(merged.is_full());
        assert_eq!(merged.items.len(), 2);
    }
}
