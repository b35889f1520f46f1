//! Health tracking types

use serde::{Deserialize, Serialize};

/// One completed upstream call, as stored in the recent-outcomes list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Completion time, unix seconds.
    pub ts: f64,
    /// Whether the call succeeded.
    pub success: bool,
    /// Call duration in milliseconds.
    pub duration_ms: u64,
}

/// Summary health view of one provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    /// Lifetime success rate, 0.0 to 1.0.
    pub success_rate: f64,
    /// Lifetime average call duration in milliseconds.
    pub avg_duration_ms: f64,
    /// Lifetime completed calls.
    pub total_requests: u64,
    /// Failures among the most recent outcomes.
    pub recent_failures: u32,
    /// Binary routing signal.
    pub healthy: bool,
}

impl ProviderHealth {
    /// The optimistic default for a provider with no recorded history: a
    /// brand-new or just-reset provider must not be refused all traffic.
    pub fn assume_healthy() -> Self {
        Self {
            success_rate: 1.0,
            avg_duration_ms: 0.0,
            total_requests: 0,
            recent_failures: 0,
            healthy: true,
        }
    }
}
