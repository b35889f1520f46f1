//! In-process coordination store
//!
//! Single-worker counterpart of the Redis store, used for single-process
//! deployments and tests. One mutex acquisition per operation supplies the
//! same atomicity the Lua procedures supply in Redis. No await happens while
//! the lock is held.
//!
//! TTLs are ignored: they exist as a crash-recovery safety net for state
//! that outlives a worker, and this store's state dies with the process.

use crate::core::store::{AdmissionOutcome, AdmissionRequest, CoordinationStore, LimiterKeys};
use crate::utils::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Default)]
struct MemoryState {
    /// Sorted-set counterpart: (score, member) pairs per window key.
    windows: HashMap<String, Vec<(f64, String)>>,
    counters: HashMap<String, i64>,
    hashes: HashMap<String, HashMap<String, f64>>,
    sequences: HashMap<String, u64>,
    lists: HashMap<String, VecDeque<String>>,
}

/// In-process [`CoordinationStore`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn try_admit(&self, req: AdmissionRequest<'_>) -> Result<AdmissionOutcome> {
        let mut state = self.state.lock();
        let MemoryState {
            windows,
            counters,
            hashes,
            ..
        } = &mut *state;

        let window = windows.entry(req.keys.qpm.clone()).or_default();
        window.retain(|(score, _)| *score > req.window_start);

        let held = counters.get(&req.keys.concurrent).copied().unwrap_or(0);
        if held >= req.concurrency_limit as i64 {
            return Ok(AdmissionOutcome::ConcurrentLimit { observed: held });
        }

        let in_window = window.len() as i64;
        if in_window >= req.qpm_limit as i64 {
            return Ok(AdmissionOutcome::QpmLimit { observed: in_window });
        }

        window.push((req.now, req.token.clone()));
        let counter = counters.entry(req.keys.concurrent.clone()).or_insert(0);
        *counter += 1;
        let stats = hashes.entry(req.keys.stats.clone()).or_default();
        *stats.entry("total_requests".to_string()).or_insert(0.0) += 1.0;

        Ok(AdmissionOutcome::Admitted {
            concurrent: *counter,
            in_window: in_window + 1,
        })
    }

    async fn release_slot(&self, keys: &LimiterKeys) -> Result<i64> {
        let mut state = self.state.lock();
        let counter = state.counters.entry(keys.concurrent.clone()).or_insert(0);
        *counter -= 1;
        if *counter < 0 {
            *counter = 0;
        }
        Ok(*counter)
    }

    async fn window_count(&self, keys: &LimiterKeys, window_start: f64) -> Result<u64> {
        let state = self.state.lock();
        let count = state
            .windows
            .get(&keys.qpm)
            .map(|window| window.iter().filter(|(score, _)| *score > window_start).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn held_slots(&self, keys: &LimiterKeys) -> Result<i64> {
        let state = self.state.lock();
        Ok(state.counters.get(&keys.concurrent).copied().unwrap_or(0))
    }

    async fn hash_incr(
        &self,
        key: &str,
        field: &str,
        delta: f64,
        _ttl: Option<Duration>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let hash = state.hashes.entry(key.to_string()).or_default();
        *hash.entry(field.to_string()).or_insert(0.0) += delta;
        Ok(())
    }

    async fn hash_snapshot(&self, key: &str) -> Result<HashMap<String, f64>> {
        let state = self.state.lock();
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn next_sequence(&self, key: &str, _ttl: Duration) -> Result<u64> {
        let mut state = self.state.lock();
        let sequence = state.sequences.entry(key.to_string()).or_insert(0);
        *sequence += 1;
        Ok(*sequence)
    }

    async fn push_recent(
        &self,
        key: &str,
        entry: &str,
        keep: usize,
        _ttl: Duration,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let list = state.lists.entry(key.to_string()).or_default();
        list.push_front(entry.to_string());
        list.truncate(keep);
        Ok(())
    }

    async fn recent_entries(&self, key: &str) -> Result<Vec<String>> {
        let state = self.state.lock();
        Ok(state
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_keys(&self, keys: &[String]) -> Result<()> {
        let mut state = self.state.lock();
        for key in keys {
            state.windows.remove(key);
            state.counters.remove(key);
            state.hashes.remove(key);
            state.sequences.remove(key);
            state.lists.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UpstreamEndpoint;

    fn keys() -> LimiterKeys {
        LimiterKeys::for_endpoint(UpstreamEndpoint::DashscopeDeepseek)
    }

    fn request<'a>(keys: &'a LimiterKeys, token: &str, now: f64) -> AdmissionRequest<'a> {
        AdmissionRequest {
            keys,
            concurrency_limit: 2,
            qpm_limit: 3,
            token: token.to_string(),
            now,
            window_start: now - 60.0,
        }
    }

    #[tokio::test]
    async fn test_admit_prunes_expired_entries() {
        let store = MemoryStore::new();
        let keys = keys();

        // Two entries at t=0, both expired by t=100.
        for token in ["a", "b"] {
            let outcome = store.try_admit(request(&keys, token, 0.0)).await.unwrap();
            assert!(matches!(outcome, AdmissionOutcome::Admitted { .. }));
            store.release_slot(&keys).await.unwrap();
        }
        assert_eq!(store.window_count(&keys, -60.0).await.unwrap(), 2);

        let outcome = store.try_admit(request(&keys, "c", 100.0)).await.unwrap();
        assert!(matches!(outcome, AdmissionOutcome::Admitted { .. }));
        assert_eq!(store.window_count(&keys, 40.0).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejection_mutates_nothing() {
        let store = MemoryStore::new();
        let keys = keys();

        store.try_admit(request(&keys, "a", 0.0)).await.unwrap();
        store.try_admit(request(&keys, "b", 0.0)).await.unwrap();

        let outcome = store.try_admit(request(&keys, "c", 0.0)).await.unwrap();
        assert_eq!(outcome, AdmissionOutcome::ConcurrentLimit { observed: 2 });

        // The rejected attempt left no trace.
        assert_eq!(store.held_slots(&keys).await.unwrap(), 2);
        assert_eq!(store.window_count(&keys, -60.0).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_release_clamps_at_zero() {
        let store = MemoryStore::new();
        let keys = keys();

        assert_eq!(store.release_slot(&keys).await.unwrap(), 0);
        assert_eq!(store.release_slot(&keys).await.unwrap(), 0);
        assert_eq!(store.held_slots(&keys).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sequence_starts_at_one() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        assert_eq!(store.next_sequence("seq", ttl).await.unwrap(), 1);
        assert_eq!(store.next_sequence("seq", ttl).await.unwrap(), 2);
        assert_eq!(store.next_sequence("other", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_list_bounded_most_recent_first() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        for i in 0..5 {
            store
                .push_recent("recent", &i.to_string(), 3, ttl)
                .await
                .unwrap();
        }
        let entries = store.recent_entries("recent").await.unwrap();
        assert_eq!(entries, vec!["4", "3", "2"]);
    }
}
