//! Shared domain types
//!
//! Providers and upstream endpoints are closed enums: every (provider,
//! endpoint) pair the gate can limit is known at compile time, so an invalid
//! combination is unrepresentable rather than a runtime string-matching
//! failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An upstream inference provider.
///
/// Exactly two providers back the dual-homed capability; everything the
/// router decides is a choice between these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Alibaba Cloud Dashscope
    Dashscope,
    /// Volcengine Ark
    Volcengine,
}

impl Provider {
    /// Stable identifier used in coordination-store keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Dashscope => "dashscope",
            Provider::Volcengine => "volcengine",
        }
    }

    /// The other provider of the pair.
    pub fn other(self) -> Self {
        match self {
            Provider::Dashscope => Provider::Volcengine,
            Provider::Volcengine => Provider::Dashscope,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An upstream deployment with independently negotiated rate limits.
///
/// Each variant gets its own limiter instance: the two physical backends of
/// the dual-homed model have separately negotiated QPM and concurrency
/// ceilings, and the Dashscope-native models share a project-level limit of
/// their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamEndpoint {
    /// DeepSeek served by Dashscope
    DashscopeDeepseek,
    /// DeepSeek served by Volcengine Ark
    VolcengineDeepseek,
    /// Dashscope-native Qwen family (shared project-level limit)
    DashscopeQwen,
}

impl UpstreamEndpoint {
    /// The provider this endpoint belongs to.
    pub fn provider(self) -> Provider {
        match self {
            UpstreamEndpoint::DashscopeDeepseek | UpstreamEndpoint::DashscopeQwen => {
                Provider::Dashscope
            }
            UpstreamEndpoint::VolcengineDeepseek => Provider::Volcengine,
        }
    }

    /// (provider, endpoint) segments used in coordination-store keys.
    pub fn key_parts(self) -> (&'static str, &'static str) {
        match self {
            UpstreamEndpoint::DashscopeDeepseek => ("dashscope", "deepseek-v3"),
            UpstreamEndpoint::VolcengineDeepseek => ("volcengine", "deepseek-v3"),
            UpstreamEndpoint::DashscopeQwen => ("dashscope", "qwen"),
        }
    }
}

impl fmt::Display for UpstreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (provider, endpoint) = self.key_parts();
        write!(f, "{provider}:{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_other_is_involution() {
        assert_eq!(Provider::Dashscope.other(), Provider::Volcengine);
        assert_eq!(Provider::Volcengine.other().other(), Provider::Volcengine);
    }

    #[test]
    fn test_provider_serialization() {
        assert_eq!(
            serde_json::to_string(&Provider::Dashscope).unwrap(),
            "\"dashscope\""
        );
        let p: Provider = serde_json::from_str("\"volcengine\"").unwrap();
        assert_eq!(p, Provider::Volcengine);
    }

    #[test]
    fn test_endpoint_provider_assignment() {
        assert_eq!(
            UpstreamEndpoint::VolcengineDeepseek.provider(),
            Provider::Volcengine
        );
        assert_eq!(
            UpstreamEndpoint::DashscopeQwen.provider(),
            Provider::Dashscope
        );
    }

    #[test]
    fn test_endpoint_display_matches_key_parts() {
        assert_eq!(
            UpstreamEndpoint::DashscopeDeepseek.to_string(),
            "dashscope:deepseek-v3"
        );
    }
}
