//! Wall-clock helpers
//!
//! Window entries are scored with wall-clock seconds so that every worker
//! process scores against the same timeline. Monotonic clocks are per-process
//! and unusable for cross-process windows.

/// Current unix time in seconds, with sub-second precision.
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
