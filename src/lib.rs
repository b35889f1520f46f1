//! # modelgate
//!
//! Distributed admission control and provider routing for multi-backend LLM
//! inference. Many stateless worker processes jointly respect per-provider
//! rate limits (requests per minute and concurrent in-flight calls) and
//! shift load toward whichever provider currently has spare capacity or
//! better health, coordinating through a shared Redis store instead of a
//! central coordinator process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use modelgate::{
//!     AdmissionController, LimiterConfig, Provider, ProviderRouter, RedisConfig,
//!     RedisStore, RouterConfig, UpstreamEndpoint,
//! };
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! #[tokio::main]
//! async fn main() -> modelgate::Result<()> {
//!     let store = Arc::new(RedisStore::connect(&RedisConfig::default()).await?);
//!
//!     let dashscope = Arc::new(AdmissionController::new(
//!         LimiterConfig::new(UpstreamEndpoint::DashscopeDeepseek, 600, 20),
//!         store.clone(),
//!     )?);
//!     let volcengine = Arc::new(AdmissionController::new(
//!         LimiterConfig::new(UpstreamEndpoint::VolcengineDeepseek, 1200, 40),
//!         store.clone(),
//!     )?);
//!     let router = ProviderRouter::new(
//!         RouterConfig::default(),
//!         store,
//!         dashscope,
//!         volcengine,
//!     );
//!
//!     let resolved = router.map_model("deepseek-v3").await?;
//!     let limiter = router.limiter(resolved.provider);
//!
//!     limiter.acquire().await?;
//!     let started = Instant::now();
//!     let success = call_upstream(resolved.provider, resolved.model).await;
//!     limiter.release().await?;
//!     router
//!         .record_provider_metrics(resolved.provider, success, started.elapsed())
//!         .await;
//!     Ok(())
//! }
//!
//! async fn call_upstream(_provider: Provider, _model: &str) -> bool {
//!     true
//! }
//! ```
//!
//! Admission decisions made by one worker are immediately visible to all
//! others: the check-and-admit step runs as a single atomic procedure inside
//! the store, so the ceilings hold across any number of processes without a
//! distributed lock. If the store is unreachable, admission fails loudly —
//! there is no fail-open path that would quietly drop rate-limit
//! enforcement during an outage.

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod storage;
pub mod utils;

pub use config::{LimiterConfig, RedisConfig, RouteStrategy, RouterConfig, RoutingWeights};
pub use core::health::{HealthTracker, OutcomeRecord, ProviderHealth};
pub use core::limiter::{AdmissionController, LimiterStats};
pub use core::router::{DUAL_HOMED_CAPABILITY, ProviderRouter, ResolvedModel};
pub use core::store::{AdmissionOutcome, AdmissionRequest, CoordinationStore, LimiterKeys};
pub use core::types::{Provider, UpstreamEndpoint};
pub use storage::memory::MemoryStore;
pub use storage::redis::RedisStore;
pub use utils::error::{GateError, Result};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
