//! Limiter stats types

use serde::Serialize;

/// Point-in-time view of one limiter plus the shared lifetime counters.
#[derive(Debug, Clone, Serialize)]
pub struct LimiterStats {
    /// Admissions currently inside the sliding one-minute window.
    pub in_window: u64,
    /// Requests admitted but not yet released.
    pub held_slots: i64,
    /// Configured requests-per-minute ceiling.
    pub qpm_limit: u32,
    /// Configured concurrent in-flight ceiling.
    pub concurrency_limit: u32,
    /// Lifetime admissions across all limiters sharing the stats hash.
    pub total_requests: u64,
    /// Lifetime count of acquires that had to wait at least one backoff.
    pub total_waits: u64,
    /// Lifetime seconds spent waiting for admission.
    pub total_wait_time_secs: f64,
}
