//! Per-endpoint admission control
//!
//! One [`AdmissionController`] instance guards one upstream endpoint,
//! enforcing a sliding one-minute request-count ceiling and a concurrent
//! in-flight ceiling across every worker process sharing the coordination
//! store. The store's atomic admission procedure does the enforcement; this
//! module owns the poll/backoff loop around it.

mod types;


pub use types::LimiterStats;

use crate::config::LimiterConfig;
use crate::core::store::{AdmissionOutcome, AdmissionRequest, CoordinationStore, LimiterKeys};
use crate::utils::error::{GateError, Result};
use crate::utils::time::unix_now;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Sliding window length.
const WINDOW_SECS: f64 = 60.0;

/// Backoff after a concurrency rejection. Slots free as soon as an in-flight
/// call completes, so poll briskly.
const CONCURRENT_BACKOFF: Duration = Duration::from_millis(100);

/// Backoff after a window rejection. Window pressure resolves only as
/// entries age out, so faster polling wastes cycles.
const QPM_BACKOFF: Duration = Duration::from_millis(1000);

/// Waits longer than this are logged when admission finally succeeds.
const SLOW_WAIT_THRESHOLD: Duration = Duration::from_secs(1);

/// An ongoing wait re-logs at this interval so starvation is visible.
const STARVATION_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Globally coordinated limiter for one upstream endpoint.
pub struct AdmissionController {
    config: LimiterConfig,
    keys: LimiterKeys,
    store: Arc<dyn CoordinationStore>,
}

impl AdmissionController {
    /// Create a limiter. Fails if an enabled limiter has a zero ceiling.
    pub fn new(config: LimiterConfig, store: Arc<dyn CoordinationStore>) -> Result<Self> {
        if config.enabled && config.qpm_limit == 0 {
            return Err(GateError::Config(format!(
                "qpm_limit must be positive for enabled endpoint {}",
                config.endpoint
            )));
        }
        if config.enabled && config.concurrency_limit == 0 {
            return Err(GateError::Config(format!(
                "concurrency_limit must be positive for enabled endpoint {}",
                config.endpoint
            )));
        }

        let keys = LimiterKeys::for_endpoint(config.endpoint);
        info!(
            endpoint = %config.endpoint,
            qpm_limit = config.qpm_limit,
            concurrency_limit = config.concurrency_limit,
            enabled = config.enabled,
            "Creating admission controller"
        );
        Ok(Self {
            config,
            keys,
            store,
        })
    }

    /// Block until a slot is admitted under both ceilings.
    ///
    /// There is no default timeout; callers that need a deadline wrap this
    /// in their own cancellation. Abandoning the wait is safe at any point,
    /// because rejected attempts mutate nothing. Store errors propagate: a
    /// limiter that silently admits during a store outage would let every
    /// worker violate the vendor's hard limits at once.
    pub async fn acquire(&self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let started = Instant::now();
        let mut blocked = false;
        let mut last_starvation_log = started;

        loop {
            let now = unix_now();
            // A fresh token per attempt: a superseded attempt must not be
            // able to double-register under an earlier token.
            let outcome = self
                .store
                .try_admit(AdmissionRequest {
                    keys: &self.keys,
                    concurrency_limit: self.config.concurrency_limit,
                    qpm_limit: self.config.qpm_limit,
                    token: Uuid::new_v4().to_string(),
                    now,
                    window_start: now - WINDOW_SECS,
                })
                .await?;

            let backoff = match outcome {
                AdmissionOutcome::Admitted {
                    concurrent,
                    in_window,
                } => {
                    debug!(
                        endpoint = %self.config.endpoint,
                        concurrent,
                        in_window,
                        "Admission granted"
                    );
                    if blocked {
                        let waited = started.elapsed();
                        if waited >= SLOW_WAIT_THRESHOLD {
                            warn!(
                                endpoint = %self.config.endpoint,
                                waited_ms = waited.as_millis() as u64,
                                "Admission granted after slow wait"
                            );
                        }
                        self.bump_stat("total_wait_time", waited.as_secs_f64())
                            .await;
                    }
                    return Ok(());
                }
                AdmissionOutcome::ConcurrentLimit { observed } => {
                    debug!(
                        endpoint = %self.config.endpoint,
                        observed,
                        limit = self.config.concurrency_limit,
                        "Concurrency ceiling reached, backing off"
                    );
                    CONCURRENT_BACKOFF
                }
                AdmissionOutcome::QpmLimit { observed } => {
                    debug!(
                        endpoint = %self.config.endpoint,
                        observed,
                        limit = self.config.qpm_limit,
                        "Sliding window full, backing off"
                    );
                    QPM_BACKOFF
                }
            };

            if !blocked {
                blocked = true;
                self.bump_stat("total_waits", 1.0).await;
            }

            if started.elapsed() >= STARVATION_LOG_INTERVAL
                && last_starvation_log.elapsed() >= STARVATION_LOG_INTERVAL
            {
                warn!(
                    endpoint = %self.config.endpoint,
                    waited_secs = started.elapsed().as_secs(),
                    "Still waiting for admission"
                );
                last_starvation_log = Instant::now();
            }

            tokio::time::sleep(backoff).await;
        }
    }

    /// Release a previously acquired slot. Clamped at zero on the store
    /// side, so a double release is harmless. Store errors propagate.
    pub async fn release(&self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let held = self.store.release_slot(&self.keys).await?;
        debug!(endpoint = %self.config.endpoint, held, "Admission released");
        Ok(())
    }

    /// Non-mutating check for spare capacity under both ceilings.
    ///
    /// Best-effort by design: the answer can be stale by the time the caller
    /// acts on it. `acquire()` remains the only authoritative gate.
    pub async fn headroom(&self) -> Result<bool> {
        if !self.config.enabled {
            return Ok(true);
        }
        let held = self.store.held_slots(&self.keys).await?;
        if held >= self.config.concurrency_limit as i64 {
            return Ok(false);
        }
        let in_window = self
            .store
            .window_count(&self.keys, unix_now() - WINDOW_SECS)
            .await?;
        Ok(in_window < self.config.qpm_limit as u64)
    }

    /// Current counts, configured ceilings and lifetime counters.
    pub async fn stats(&self) -> Result<LimiterStats> {
        let in_window = self
            .store
            .window_count(&self.keys, unix_now() - WINDOW_SECS)
            .await?;
        let held_slots = self.store.held_slots(&self.keys).await?;
        let counters = self.store.hash_snapshot(&self.keys.stats).await?;

        Ok(LimiterStats {
            in_window,
            held_slots,
            qpm_limit: self.config.qpm_limit,
            concurrency_limit: self.config.concurrency_limit,
            total_requests: counters.get("total_requests").copied().unwrap_or(0.0) as u64,
            total_waits: counters.get("total_waits").copied().unwrap_or(0.0) as u64,
            total_wait_time_secs: counters.get("total_wait_time").copied().unwrap_or(0.0),
        })
    }

    /// Delete this limiter's keys. Test isolation only.
    pub async fn clear_state(&self) -> Result<()> {
        self.store.remove_keys(&self.keys.all()).await
    }

    /// The endpoint this limiter guards.
    pub fn endpoint(&self) -> crate::core::types::UpstreamEndpoint {
        self.config.endpoint
    }

    /// Wait statistics are telemetry: an admission that succeeded must not
    /// fail because a stats increment did not.
    async fn bump_stat(&self, field: &str, delta: f64) {
        if let Err(err) = self
            .store
            .hash_incr(&self.keys.stats, field, delta, None)
            .await
        {
            debug!(
                endpoint = %self.config.endpoint,
                field,
                error = %err,
                "Dropping wait stat update"
            );
        }
    }
}
