//! Provider routing for the dual-homed capability
//!
//! The router picks which of the two physical backends serves a
//! logically-equivalent request. The decision is biased by capacity and
//! health but never guaranteed by them: the pre-checks read possibly-stale
//! stats, and the admission controller's `acquire()` remains the only
//! authoritative gate. That trade keeps routing at zero extra round-trips
//! in the common case.

mod mapping;
mod strategy;

#[cfg(test)]
mod tests;

pub use mapping::{DUAL_HOMED_CAPABILITY, REASONER_CAPABILITY, ResolvedModel};

use crate::config::RouterConfig;
use crate::core::health::{HealthTracker, ProviderHealth};
use crate::core::limiter::AdmissionController;
use crate::core::store::CoordinationStore;
use crate::core::types::Provider;
use crate::utils::error::{GateError, Result};
use std::sync::Arc;
use std::time::Duration;
use strategy::StrategySelector;
use tracing::{debug, info, warn};

/// Routes requests for the dual-homed capability between its two backends.
///
/// Safe to call concurrently from many processes: all mutable state lives in
/// the coordination store, the limiters, or the health tracker.
pub struct ProviderRouter {
    config: RouterConfig,
    dashscope_limiter: Arc<AdmissionController>,
    volcengine_limiter: Arc<AdmissionController>,
    health: HealthTracker,
    selector: StrategySelector,
}

impl ProviderRouter {
    /// Create a router over the two per-provider limiters guarding the
    /// dual-homed capability's endpoints.
    pub fn new(
        config: RouterConfig,
        store: Arc<dyn CoordinationStore>,
        dashscope_limiter: Arc<AdmissionController>,
        volcengine_limiter: Arc<AdmissionController>,
    ) -> Self {
        info!(
            strategy = ?config.strategy,
            enabled = config.enabled,
            rate_limit_aware = config.rate_limit_aware,
            "Creating provider router"
        );
        let selector = StrategySelector::new(
            config.strategy,
            config.weights,
            store.clone(),
            DUAL_HOMED_CAPABILITY,
        );
        Self {
            config,
            dashscope_limiter,
            volcengine_limiter,
            health: HealthTracker::new(store),
            selector,
        }
    }

    /// Choose a provider for the dual-homed capability.
    ///
    /// Capacity is consulted before health: a provider that is healthy but
    /// at its rate ceiling is not actually usable right now. Ties on both
    /// fall through to the configured strategy.
    pub async fn select_provider(&self) -> Provider {
        if !self.config.enabled {
            return Provider::Dashscope;
        }

        if self.config.rate_limit_aware {
            let dashscope_free = self.can_acquire_now(Provider::Dashscope).await;
            let volcengine_free = self.can_acquire_now(Provider::Volcengine).await;
            match (dashscope_free, volcengine_free) {
                (true, false) => {
                    debug!("Preferring dashscope: volcengine has no spare capacity");
                    return Provider::Dashscope;
                }
                (false, true) => {
                    debug!("Preferring volcengine: dashscope has no spare capacity");
                    return Provider::Volcengine;
                }
                _ => {}
            }

            let dashscope_health = self.health.health(Provider::Dashscope).await;
            let volcengine_health = self.health.health(Provider::Volcengine).await;
            match (dashscope_health.healthy, volcengine_health.healthy) {
                (true, false) => {
                    debug!("Preferring dashscope: volcengine is unhealthy");
                    return Provider::Dashscope;
                }
                (false, true) => {
                    debug!("Preferring volcengine: dashscope is unhealthy");
                    return Provider::Volcengine;
                }
                _ => {}
            }
        }

        self.selector.select().await
    }

    /// Resolve a logical capability to a concrete (provider, model) pair.
    ///
    /// Only the dual-homed capability involves a routing decision. The
    /// resolved pair is then checked against the standing substitution rule.
    pub async fn map_model(&self, logical: &str) -> Result<ResolvedModel> {
        let resolved = if logical == DUAL_HOMED_CAPABILITY {
            let provider = self.select_provider().await;
            ResolvedModel {
                provider,
                model: mapping::dual_homed_model(provider),
            }
        } else {
            mapping::fixed_mapping(logical)
                .ok_or_else(|| GateError::UnknownModel(logical.to_string()))?
        };

        if let Some(substituted) = mapping::forced_substitution(logical, resolved.provider) {
            warn!(
                logical,
                banned = %resolved.provider,
                substitute = %substituted.provider,
                "Forcing provider substitution for capability with an unusable rate limit"
            );
            return Ok(substituted);
        }
        Ok(resolved)
    }

    /// Best-effort, non-mutating capacity probe.
    ///
    /// Used only to bias selection. A probe failure reads as "has capacity":
    /// the authoritative `acquire()` will still block or fail as needed, and
    /// refusing to route because a read-only probe errored would turn a
    /// telemetry hiccup into an outage.
    pub async fn can_acquire_now(&self, provider: Provider) -> bool {
        match self.limiter(provider).headroom().await {
            Ok(headroom) => headroom,
            Err(err) => {
                debug!(
                    provider = %provider,
                    error = %err,
                    "Capacity probe failed, assuming headroom"
                );
                true
            }
        }
    }

    /// Record the outcome of a completed upstream call.
    pub async fn record_provider_metrics(
        &self,
        provider: Provider,
        success: bool,
        duration: Duration,
    ) {
        self.health.record_outcome(provider, success, duration).await;
    }

    /// Summary health for one provider.
    pub async fn provider_health(&self, provider: Provider) -> ProviderHealth {
        self.health.health(provider).await
    }

    /// The limiter guarding a provider's dual-homed endpoint.
    pub fn limiter(&self, provider: Provider) -> &Arc<AdmissionController> {
        match provider {
            Provider::Dashscope => &self.dashscope_limiter,
            Provider::Volcengine => &self.volcengine_limiter,
        }
    }
}
