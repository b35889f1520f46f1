//! Coordination store abstraction
//!
//! All cross-process state lives behind [`CoordinationStore`]. Two
//! implementations exist: the Redis-backed store shared by every worker
//! process, and an in-process store for single-worker deployments and tests.
//! The implementation is chosen at construction; nothing branches on store
//! availability at call time.
//!
//! The one correctness-critical operation is [`CoordinationStore::try_admit`]:
//! window pruning, both ceiling checks and all mutations happen in a single
//! atomic unit on the store side. A rejected admission mutates nothing, which
//! is what lets callers abandon a wait without any compensating action.

use crate::core::types::UpstreamEndpoint;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Keys a single limiter instance operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterKeys {
    /// Sorted set of admission tokens scored by admission time.
    pub qpm: String,
    /// Integer count of admitted-but-not-released requests.
    pub concurrent: String,
    /// Hash of lifetime counters, shared by all limiters.
    pub stats: String,
}

impl LimiterKeys {
    /// Derive the key set for an upstream endpoint.
    pub fn for_endpoint(endpoint: UpstreamEndpoint) -> Self {
        let (provider, name) = endpoint.key_parts();
        Self {
            qpm: format!("rate:{provider}:{name}:qpm"),
            concurrent: format!("rate:{provider}:{name}:concurrent"),
            stats: "rate:stats".to_string(),
        }
    }

    /// Every key owned by this limiter, for administrative reset.
    pub fn all(&self) -> Vec<String> {
        vec![self.qpm.clone(), self.concurrent.clone(), self.stats.clone()]
    }
}

/// One admission attempt, evaluated atomically by the store.
#[derive(Debug)]
pub struct AdmissionRequest<'a> {
    /// Keys of the limiter making the attempt.
    pub keys: &'a LimiterKeys,
    /// Concurrent in-flight ceiling.
    pub concurrency_limit: u32,
    /// Sliding one-minute request-count ceiling.
    pub qpm_limit: u32,
    /// Unique token for this attempt. Never reused across retries, so a
    /// superseded attempt can not double-register.
    pub token: String,
    /// Attempt time, unix seconds.
    pub now: f64,
    /// Window lower bound; entries scored at or below this are expired.
    pub window_start: f64,
}

/// Tagged result of one atomic admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Admitted; both counters were below their ceilings and have been
    /// updated. Values are post-increment.
    Admitted {
        /// Concurrency counter after the increment.
        concurrent: i64,
        /// Window cardinality after the insert.
        in_window: i64,
    },
    /// The concurrency ceiling was reached. Nothing was mutated.
    ConcurrentLimit {
        /// Counter value observed at check time.
        observed: i64,
    },
    /// The sliding window was full. Nothing was mutated.
    QpmLimit {
        /// Window cardinality observed at check time.
        observed: i64,
    },
}

/// Shared mutable state reachable by every worker process.
///
/// `try_admit` and `release_slot` are correctness-critical and must be
/// atomic. The telemetry operations (`hash_incr`, `push_recent`) are
/// deliberately relaxed: losing or double-counting a small fraction of
/// telemetry under a race is acceptable, losing a rate-limit enforcement
/// race is not.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Execute the atomic admission procedure.
    async fn try_admit(&self, req: AdmissionRequest<'_>) -> Result<AdmissionOutcome>;

    /// Decrement the concurrency counter, clamped at zero. Returns the
    /// post-decrement value.
    async fn release_slot(&self, keys: &LimiterKeys) -> Result<i64>;

    /// Read-only count of window entries newer than `window_start`.
    async fn window_count(&self, keys: &LimiterKeys, window_start: f64) -> Result<u64>;

    /// Read-only value of the concurrency counter.
    async fn held_slots(&self, keys: &LimiterKeys) -> Result<i64>;

    /// Relaxed increment of a counter field, refreshing the key TTL when one
    /// is given.
    async fn hash_incr(
        &self,
        key: &str,
        field: &str,
        delta: f64,
        ttl: Option<Duration>,
    ) -> Result<()>;

    /// Read all counter fields of a hash. Missing keys read as empty.
    async fn hash_snapshot(&self, key: &str) -> Result<HashMap<String, f64>>;

    /// Atomically advance a shared sequence, refreshing its TTL. Returns the
    /// post-increment value; the first call returns 1.
    async fn next_sequence(&self, key: &str, ttl: Duration) -> Result<u64>;

    /// Prepend an entry to a bounded most-recent-first list, trimming it to
    /// `keep` entries and refreshing its TTL.
    async fn push_recent(&self, key: &str, entry: &str, keep: usize, ttl: Duration) -> Result<()>;

    /// Read a bounded recent list, most recent first.
    async fn recent_entries(&self, key: &str) -> Result<Vec<String>>;

    /// Delete keys. Administrative reset only.
    async fn remove_keys(&self, keys: &[String]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_keys_shape() {
        let keys = LimiterKeys::for_endpoint(UpstreamEndpoint::VolcengineDeepseek);
        assert_eq!(keys.qpm, "rate:volcengine:deepseek-v3:qpm");
        assert_eq!(keys.concurrent, "rate:volcengine:deepseek-v3:concurrent");
        assert_eq!(keys.stats, "rate:stats");
    }

    #[test]
    fn test_stats_key_is_shared_across_endpoints() {
        let a = LimiterKeys::for_endpoint(UpstreamEndpoint::DashscopeDeepseek);
        let b = LimiterKeys::for_endpoint(UpstreamEndpoint::DashscopeQwen);
        assert_eq!(a.stats, b.stats);
        assert_ne!(a.qpm, b.qpm);
    }
}
