//! Rolling per-provider health tracking
//!
//! Outcomes are recorded after every completed upstream call: lifetime
//! counters plus a bounded most-recent-first outcome list, both in the
//! coordination store so every worker sees the same picture. Recording is
//! best-effort telemetry; a failure here must never fail the request that
//! was being recorded.

mod types;


pub use types::{OutcomeRecord, ProviderHealth};

use crate::core::store::CoordinationStore;
use crate::core::types::Provider;
use crate::utils::error::Result;
use crate::utils::time::unix_now;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Recent outcomes kept per provider.
const RECENT_OUTCOMES_KEPT: usize = 100;

/// Outcomes inspected for the recent-failure signal. A provider whose last
/// ten calls all failed is down regardless of its lifetime record.
const RECENT_FAILURE_PROBE: usize = 10;

/// Failure count at which a provider stops being healthy.
const RECENT_FAILURE_CEILING: u32 = 10;

/// Minimum lifetime success rate for a healthy provider.
const SUCCESS_RATE_FLOOR: f64 = 0.8;

/// Idle providers forget their history after this long.
const STATS_TTL: Duration = Duration::from_secs(3600);

/// Rolling outcome and latency statistics per provider.
pub struct HealthTracker {
    store: Arc<dyn CoordinationStore>,
}

impl HealthTracker {
    /// Create a tracker over the given store.
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self { store }
    }

    /// Record one completed call. Never fails: tracking errors are logged
    /// and dropped.
    pub async fn record_outcome(&self, provider: Provider, success: bool, duration: Duration) {
        if let Err(err) = self.try_record(provider, success, duration).await {
            debug!(
                provider = %provider,
                error = %err,
                "Dropping provider outcome record"
            );
        }
    }

    /// Summary health for one provider. A provider with no recorded history
    /// is assumed healthy, and so is one whose stats cannot be read: the
    /// router must not refuse all traffic because telemetry is unavailable.
    pub async fn health(&self, provider: Provider) -> ProviderHealth {
        match self.try_health(provider).await {
            Ok(health) => health,
            Err(err) => {
                debug!(
                    provider = %provider,
                    error = %err,
                    "Health read failed, assuming healthy"
                );
                ProviderHealth::assume_healthy()
            }
        }
    }

    async fn try_record(&self, provider: Provider, success: bool, duration: Duration) -> Result<()> {
        let stats_key = stats_key(provider);
        let counter = if success {
            "success_count"
        } else {
            "failure_count"
        };

        self.store
            .hash_incr(&stats_key, "total_requests", 1.0, Some(STATS_TTL))
            .await?;
        self.store
            .hash_incr(&stats_key, counter, 1.0, Some(STATS_TTL))
            .await?;
        self.store
            .hash_incr(
                &stats_key,
                "total_duration_ms",
                duration.as_millis() as f64,
                Some(STATS_TTL),
            )
            .await?;

        let record = serde_json::to_string(&OutcomeRecord {
            ts: unix_now(),
            success,
            duration_ms: duration.as_millis() as u64,
        })?;
        self.store
            .push_recent(&recent_key(provider), &record, RECENT_OUTCOMES_KEPT, STATS_TTL)
            .await
    }

    async fn try_health(&self, provider: Provider) -> Result<ProviderHealth> {
        let counters = self.store.hash_snapshot(&stats_key(provider)).await?;
        let total = counters.get("total_requests").copied().unwrap_or(0.0);
        if total < 1.0 {
            return Ok(ProviderHealth::assume_healthy());
        }

        let successes = counters.get("success_count").copied().unwrap_or(0.0);
        let total_duration_ms = counters.get("total_duration_ms").copied().unwrap_or(0.0);
        let success_rate = successes / total;
        let avg_duration_ms = total_duration_ms / total;

        let recent = self.store.recent_entries(&recent_key(provider)).await?;
        let recent_failures = recent
            .iter()
            .take(RECENT_FAILURE_PROBE)
            .filter_map(|entry| serde_json::from_str::<OutcomeRecord>(entry).ok())
            .filter(|outcome| !outcome.success)
            .count() as u32;

        Ok(ProviderHealth {
            success_rate,
            avg_duration_ms,
            total_requests: total as u64,
            recent_failures,
            healthy: success_rate > SUCCESS_RATE_FLOOR && recent_failures < RECENT_FAILURE_CEILING,
        })
    }
}

fn stats_key(provider: Provider) -> String {
    format!("loadbalancer:provider:{}:stats", provider.as_str())
}

fn recent_key(provider: Provider) -> String {
    format!("loadbalancer:provider:{}:recent", provider.as_str())
}
