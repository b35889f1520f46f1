//! Test doubles shared by the core module tests

use crate::core::store::{AdmissionOutcome, AdmissionRequest, CoordinationStore, LimiterKeys};
use crate::utils::error::{GateError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// A coordination store whose every operation fails, simulating an outage.
pub(crate) struct UnreachableStore;

fn unreachable() -> GateError {
    GateError::Store("connection refused".to_string())
}

#[async_trait]
impl CoordinationStore for UnreachableStore {
    async fn try_admit(&self, _req: AdmissionRequest<'_>) -> Result<AdmissionOutcome> {
        Err(unreachable())
    }

    async fn release_slot(&self, _keys: &LimiterKeys) -> Result<i64> {
        Err(unreachable())
    }

    async fn window_count(&self, _keys: &LimiterKeys, _window_start: f64) -> Result<u64> {
        Err(unreachable())
    }

    async fn held_slots(&self, _keys: &LimiterKeys) -> Result<i64> {
        Err(unreachable())
    }

    async fn hash_incr(
        &self,
        _key: &str,
        _field: &str,
        _delta: f64,
        _ttl: Option<Duration>,
    ) -> Result<()> {
        Err(unreachable())
    }

    async fn hash_snapshot(&self, _key: &str) -> Result<HashMap<String, f64>> {
        Err(unreachable())
    }

    async fn next_sequence(&self, _key: &str, _ttl: Duration) -> Result<u64> {
        Err(unreachable())
    }

    async fn push_recent(
        &self,
        _key: &str,
        _entry: &str,
        _keep: usize,
        _ttl: Duration,
    ) -> Result<()> {
        Err(unreachable())
    }

    async fn recent_entries(&self, _key: &str) -> Result<Vec<String>> {
        Err(unreachable())
    }

    async fn remove_keys(&self, _keys: &[String]) -> Result<()> {
        Err(unreachable())
    }
}
