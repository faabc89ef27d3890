//! Non-blocking admission by dedup key.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;
use tracing::debug;

use crate::metrics::set_in_flight;

#[derive(Default)]
struct GateState {
    keys: Mutex<HashSet<String>>,
    idle: Notify,
}

impl GateState {
    fn keys(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admits at most one job per dedup key at a time.
///
/// Check-and-insert happens under a single synchronous lock, so of two
/// racing callers exactly one wins. The caller is never blocked on job work.
#[derive(Clone, Default)]
pub struct AdmissionGate {
    state: Arc<GateState>,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`. Returns `None` if another job holds it.
    pub fn try_admit(&self, key: &str) -> Option<AdmissionGuard> {
        let count = {
            let mut keys = self.state.keys();
            if !keys.insert(key.to_string()) {
                return None;
            }
            keys.len()
        };
        set_in_flight(count);

        Some(AdmissionGuard {
            key: key.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    /// Check whether `key` is currently held.
    pub fn is_held(&self, key: &str) -> bool {
        self.state.keys().contains(key)
    }

    /// Number of keys currently held.
    pub fn in_flight(&self) -> usize {
        self.state.keys().len()
    }

    /// Wait until no key is held.
    pub async fn wait_idle(&self) {
        loop {
            // Registered before the check so a release in between is not missed.
            let notified = self.state.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Holds a dedup key; dropping it releases the key.
pub struct AdmissionGuard {
    key: String,
    state: Arc<GateState>,
}

impl AdmissionGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        let count = {
            let mut keys = self.state.keys();
            keys.remove(&self.key);
            keys.len()
        };
        set_in_flight(count);
        debug!(key = %self.key, "Released admission key");
        self.state.idle.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_back_to_back_admission() {
        let gate = AdmissionGate::new();
        let first = gate.try_admit("1:abc");
        let second = gate.try_admit("1:abc");
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(gate.in_flight(), 1);
    }

    #[test]
    fn test_release_allows_readmission() {
        let gate = AdmissionGate::new();
        let guard = gate.try_admit("1:abc").unwrap();
        assert!(gate.is_held("1:abc"));
        drop(guard);
        assert!(!gate.is_held("1:abc"));
        assert!(gate.try_admit("1:abc").is_some());
    }

    #[test]
    fn test_distinct_keys_independent() {
        let gate = AdmissionGate::new();
        let _a = gate.try_admit("1:abc").unwrap();
        let _b = gate.try_admit("2:abc").unwrap();
        assert_eq!(gate.in_flight(), 2);
    }

    #[test]
    fn test_racing_threads_exactly_one_wins() {
        let gate = AdmissionGate::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                std::thread::spawn(move || gate.try_admit("7:race").map(std::mem::forget).is_some())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_wait_idle_returns_after_release() {
        let gate = AdmissionGate::new();
        let guard = gate.try_admit("1:abc").unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_idle().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
