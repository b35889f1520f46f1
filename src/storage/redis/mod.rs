//! Redis-backed coordination store
//!
//! ## Module Structure
//!
//! - `pool` - Connectivity and connection management
//! - `admission` - Atomic admission and release Lua procedures
//! - `telemetry` - Read-only probes and relaxed telemetry operations

mod admission;
mod pool;
mod telemetry;

pub use pool::RedisStore;

use crate::core::store::{AdmissionOutcome, AdmissionRequest, CoordinationStore, LimiterKeys};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

#[async_trait]
impl CoordinationStore for RedisStore {
    async fn try_admit(&self, req: AdmissionRequest<'_>) -> Result<AdmissionOutcome> {
        self.admit_atomic(&req).await
    }

    async fn release_slot(&self, keys: &LimiterKeys) -> Result<i64> {
        self.release_atomic(keys).await
    }

    async fn window_count(&self, keys: &LimiterKeys, window_start: f64) -> Result<u64> {
        self.zcount_window(keys, window_start).await
    }

    async fn held_slots(&self, keys: &LimiterKeys) -> Result<i64> {
        self.counter_value(keys).await
    }

    async fn hash_incr(
        &self,
        key: &str,
        field: &str,
        delta: f64,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.hash_incr_by(key, field, delta, ttl).await
    }

    async fn hash_snapshot(&self, key: &str) -> Result<HashMap<String, f64>> {
        self.hash_floats(key).await
    }

    async fn next_sequence(&self, key: &str, ttl: Duration) -> Result<u64> {
        self.incr_sequence(key, ttl).await
    }

    async fn push_recent(&self, key: &str, entry: &str, keep: usize, ttl: Duration) -> Result<()> {
        self.lpush_trimmed(key, entry, keep, ttl).await
    }

    async fn recent_entries(&self, key: &str) -> Result<Vec<String>> {
        self.lrange_all(key).await
    }

    async fn remove_keys(&self, keys: &[String]) -> Result<()> {
        self.delete_keys(keys).await
    }
}
