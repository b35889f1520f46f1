//! Configuration models
//!
//! All configuration is immutable after construction. Components validate
//! their configuration in their constructors; an invalid configuration is a
//! synchronous, fatal error, never retried.

use crate::core::types::UpstreamEndpoint;
use serde::{Deserialize, Serialize};

/// Per-endpoint admission limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// The upstream deployment these limits were negotiated for.
    pub endpoint: UpstreamEndpoint,
    /// Requests-per-minute ceiling (sliding window).
    #[serde(default = "default_qpm_limit")]
    pub qpm_limit: u32,
    /// Concurrent in-flight ceiling.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: u32,
    /// Disabled limiters admit everything immediately.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl LimiterConfig {
    /// Enabled limiter with the given ceilings.
    pub fn new(endpoint: UpstreamEndpoint, qpm_limit: u32, concurrency_limit: u32) -> Self {
        Self {
            endpoint,
            qpm_limit,
            concurrency_limit,
            enabled: true,
        }
    }
}

/// Router configuration for the dual-homed capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Strategy applied when neither capacity nor health biases the choice.
    #[serde(default)]
    pub strategy: RouteStrategy,
    /// Target traffic split for the weighted strategy.
    #[serde(default)]
    pub weights: RoutingWeights,
    /// Disabled routing pins the dual-homed capability to Dashscope.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Bias selection toward providers with spare capacity before applying
    /// the strategy.
    #[serde(default = "default_enabled")]
    pub rate_limit_aware: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strategy: RouteStrategy::default(),
            weights: RoutingWeights::default(),
            enabled: true,
            rate_limit_aware: true,
        }
    }
}

/// Provider selection strategy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    /// Uniform 50/50, stateless.
    Random,
    /// Draw against the configured split, stateless.
    Weighted,
    /// Shared counter, even distribution regardless of worker count.
    #[default]
    RoundRobin,
}

/// Target percentage split between the two providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingWeights {
    /// Dashscope share.
    pub dashscope: u32,
    /// Volcengine share.
    pub volcengine: u32,
}

impl Default for RoutingWeights {
    fn default() -> Self {
        Self {
            dashscope: 50,
            volcengine: 50,
        }
    }
}

impl RoutingWeights {
    /// Scale the pair so the two values sum to 100. A zero sum falls back to
    /// an even split.
    pub fn normalized(self) -> Self {
        let sum = self.dashscope + self.volcengine;
        if sum == 0 {
            return Self::default();
        }
        let dashscope = (self.dashscope * 100 + sum / 2) / sum;
        Self {
            dashscope,
            volcengine: 100 - dashscope,
        }
    }
}

/// Coordination store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL
    pub url: String,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

fn default_qpm_limit() -> u32 {
    60
}

fn default_concurrency_limit() -> u32 {
    10
}

fn default_enabled() -> bool {
    true
}

fn default_connection_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_config_deserialization_defaults() {
        let json = r#"{"endpoint": "dashscope_deepseek"}"#;
        let config: LimiterConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.endpoint, UpstreamEndpoint::DashscopeDeepseek);
        assert_eq!(config.qpm_limit, 60);
        assert_eq!(config.concurrency_limit, 10);
        assert!(config.enabled);
    }

    #[test]
    fn test_router_config_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.strategy, RouteStrategy::RoundRobin);
        assert!(config.enabled);
        assert!(config.rate_limit_aware);
    }

    #[test]
    fn test_route_strategy_serialization() {
        assert_eq!(
            serde_json::to_string(&RouteStrategy::RoundRobin).unwrap(),
            "\"round_robin\""
        );
        let s: RouteStrategy = serde_json::from_str("\"weighted\"").unwrap();
        assert_eq!(s, RouteStrategy::Weighted);
    }

    #[test]
    fn test_weights_already_normalized() {
        let weights = RoutingWeights {
            dashscope: 70,
            volcengine: 30,
        };
        assert_eq!(weights.normalized(), weights);
    }

    #[test]
    fn test_weights_scaled_to_hundred() {
        let weights = RoutingWeights {
            dashscope: 150,
            volcengine: 50,
        }
        .normalized();
        assert_eq!(weights.dashscope, 75);
        assert_eq!(weights.volcengine, 25);

        let weights = RoutingWeights {
            dashscope: 2,
            volcengine: 1,
        }
        .normalized();
        assert_eq!(weights.dashscope + weights.volcengine, 100);
        assert_eq!(weights.dashscope, 67);
    }

    #[test]
    fn test_zero_weights_fall_back_to_even_split() {
        let weights = RoutingWeights {
            dashscope: 0,
            volcengine: 0,
        }
        .normalized();
        assert_eq!(weights.dashscope, 50);
        assert_eq!(weights.volcengine, 50);
    }
}
