//! Short-lived candidate cache keyed by external id.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use vidbot_models::SearchCandidate;

/// Default lifetime of a cached candidate.
pub const DEFAULT_CANDIDATE_TTL: Duration = Duration::from_secs(600);

struct Entry {
    inserted_at: Instant,
    candidate: SearchCandidate,
}

/// TTL map of candidates recently shown to a requester.
///
/// Expired entries are evicted when read and purged on every insert.
pub struct CandidateCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Default for CandidateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CANDIDATE_TTL)
    }
}

impl CandidateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache a candidate, replacing any previous entry for its id.
    pub fn put(&self, candidate: SearchCandidate) {
        self.put_all_at([candidate], Instant::now());
    }

    /// Cache every candidate in `candidates`.
    ///
    /// Expired entries are purged first.
    pub fn put_all<I>(&self, candidates: I)
    where
        I: IntoIterator<Item = SearchCandidate>,
    {
        self.put_all_at(candidates, Instant::now());
    }

    fn put_all_at<I>(&self, candidates: I, now: Instant)
    where
        I: IntoIterator<Item = SearchCandidate>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let purged = self.purge_locked(&mut entries, now);
        if purged > 0 {
            debug!(purged, "Purged expired candidates");
        }
        for candidate in candidates {
            entries.insert(
                candidate.external_id.clone(),
                Entry {
                    inserted_at: now,
                    candidate,
                },
            );
        }
    }

    /// Look up a live candidate.
    pub fn get(&self, external_id: &str) -> Option<SearchCandidate> {
        self.get_at(external_id, Instant::now())
    }

    /// Look up a candidate as of `now`, evicting it if expired.
    pub fn get_at(&self, external_id: &str, now: Instant) -> Option<SearchCandidate> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get(external_id) {
            Some(entry) => now.saturating_duration_since(entry.inserted_at) >= self.ttl,
            None => return None,
        };
        if expired {
            entries.remove(external_id);
            return None;
        }
        entries.get(external_id).map(|e| e.candidate.clone())
    }

    /// Drop all expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        self.purge_locked(&mut entries, Instant::now())
    }

    fn purge_locked(&self, entries: &mut HashMap<String, Entry>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.inserted_at) < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str) -> SearchCandidate {
        SearchCandidate::new(id, "title", 1).with_duration(Some(30))
    }

    #[test]
    fn test_put_and_get() {
        let cache = CandidateCache::default();
        cache.put_all(vec![candidate("a"), candidate("b")]);
        assert_eq!(cache.get("a").unwrap().duration_seconds, Some(30));
        assert!(cache.get("zzz").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_expired_entry_evicted_on_read() {
        let cache = CandidateCache::new(Duration::from_secs(10));
        cache.put(candidate("a"));

        let later = Instant::now() + Duration::from_secs(11);
        assert!(cache.get_at("a", later).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_replaces_existing() {
        let cache = CandidateCache::default();
        cache.put(candidate("a"));
        cache.put(SearchCandidate::new("a", "renamed", 4));
        assert_eq!(cache.get("a").unwrap().title, "renamed");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_purges_unread_expired_entries() {
        let cache = CandidateCache::new(Duration::from_secs(10));
        let start = Instant::now();
        cache.put_all_at(vec![candidate("a"), candidate("b")], start);

        cache.put_all_at(vec![candidate("c")], start + Duration::from_secs(11));

        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("c", start + Duration::from_secs(12)).is_some());
    }

    #[test]
    fn test_purge_with_zero_ttl() {
        let cache = CandidateCache::new(Duration::ZERO);
        cache.put(candidate("a"));
        assert_eq!(cache.purge_expired(), 1);
    }
}
