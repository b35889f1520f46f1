//! Strategy-based provider selection
//!
//! The stateless strategies (random, weighted) are safe with any number of
//! worker processes by construction. Round robin alternates on a counter in
//! the coordination store, which keeps the distribution even regardless of
//! how many processes are drawing from it; a process-local counter stands in
//! only while the shared increment is failing, at the cost of an uneven
//! cross-process distribution in that degraded mode.

use crate::config::{RouteStrategy, RoutingWeights};
use crate::core::store::CoordinationStore;
use crate::core::types::Provider;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Shared round-robin counters expire after a day of disuse.
const COUNTER_TTL: Duration = Duration::from_secs(24 * 3600);

pub(super) struct StrategySelector {
    strategy: RouteStrategy,
    weights: RoutingWeights,
    store: Arc<dyn CoordinationStore>,
    counter_key: String,
    local_counter: AtomicU64,
}

impl StrategySelector {
    pub(super) fn new(
        strategy: RouteStrategy,
        weights: RoutingWeights,
        store: Arc<dyn CoordinationStore>,
        capability: &str,
    ) -> Self {
        Self {
            strategy,
            weights: weights.normalized(),
            store,
            counter_key: format!("loadbalancer:{capability}:counter"),
            local_counter: AtomicU64::new(0),
        }
    }

    pub(super) async fn select(&self) -> Provider {
        match self.strategy {
            RouteStrategy::Random => self.select_random(),
            RouteStrategy::Weighted => self.select_weighted(),
            RouteStrategy::RoundRobin => self.select_round_robin().await,
        }
    }

    fn select_random(&self) -> Provider {
        let provider = if rand::thread_rng().gen_bool(0.5) {
            Provider::Dashscope
        } else {
            Provider::Volcengine
        };
        debug!(provider = %provider, "Random selection");
        provider
    }

    fn select_weighted(&self) -> Provider {
        let draw = rand::thread_rng().gen_range(1..=100);
        let provider = if draw <= self.weights.dashscope {
            Provider::Dashscope
        } else {
            Provider::Volcengine
        };
        debug!(
            provider = %provider,
            draw,
            dashscope_weight = self.weights.dashscope,
            "Weighted selection"
        );
        provider
    }

    async fn select_round_robin(&self) -> Provider {
        let sequence = match self.store.next_sequence(&self.counter_key, COUNTER_TTL).await {
            Ok(sequence) => sequence,
            Err(err) => {
                warn!(
                    error = %err,
                    "Shared round-robin counter unavailable, using process-local \
                     counter (distribution is uneven across workers)"
                );
                self.local_counter.fetch_add(1, Ordering::Relaxed)
            }
        };
        let provider = if sequence % 2 == 0 {
            Provider::Dashscope
        } else {
            Provider::Volcengine
        };
        debug!(provider = %provider, sequence, "Round-robin selection");
        provider
    }
}
