//! Read-only probes and relaxed telemetry operations
//!
//! Nothing here participates in admission enforcement. Counter reads feed
//! stats and the router's capacity bias; hash increments and the bounded
//! recent-outcomes list feed health tracking.

use super::pool::RedisStore;
use crate::core::store::LimiterKeys;
use crate::utils::error::{GateError, Result};
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;

impl RedisStore {
    /// Count window entries strictly newer than `window_start`.
    pub(crate) async fn zcount_window(
        &self,
        keys: &LimiterKeys,
        window_start: f64,
    ) -> Result<u64> {
        let mut conn = self.connection();
        let count: u64 = conn
            .zcount(&keys.qpm, format!("({window_start}"), "+inf")
            .await
            .map_err(GateError::Redis)?;
        Ok(count)
    }

    /// Current value of the concurrency counter.
    pub(crate) async fn counter_value(&self, keys: &LimiterKeys) -> Result<i64> {
        let mut conn = self.connection();
        let value: Option<i64> = conn.get(&keys.concurrent).await.map_err(GateError::Redis)?;
        Ok(value.unwrap_or(0))
    }

    /// Increment a hash counter field, optionally refreshing the key TTL.
    pub(crate) async fn hash_incr_by(
        &self,
        key: &str,
        field: &str,
        delta: f64,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let mut conn = self.connection();
        let _: () = redis::cmd("HINCRBYFLOAT")
            .arg(key)
            .arg(field)
            .arg(delta)
            .query_async(&mut conn)
            .await
            .map_err(GateError::Redis)?;
        if let Some(ttl) = ttl {
            let _: () = conn
                .expire(key, ttl.as_secs() as i64)
                .await
                .map_err(GateError::Redis)?;
        }
        Ok(())
    }

    /// Read all fields of a counter hash as floats. Non-numeric fields are
    /// skipped.
    pub(crate) async fn hash_floats(&self, key: &str) -> Result<HashMap<String, f64>> {
        let mut conn = self.connection();
        let raw: HashMap<String, String> = conn.hgetall(key).await.map_err(GateError::Redis)?;
        Ok(raw
            .into_iter()
            .filter_map(|(field, value)| value.parse::<f64>().ok().map(|v| (field, v)))
            .collect())
    }

    /// Advance a shared sequence counter and refresh its TTL.
    pub(crate) async fn incr_sequence(&self, key: &str, ttl: Duration) -> Result<u64> {
        let mut conn = self.connection();
        let value: u64 = conn.incr(key, 1u64).await.map_err(GateError::Redis)?;
        let _: () = conn
            .expire(key, ttl.as_secs() as i64)
            .await
            .map_err(GateError::Redis)?;
        Ok(value)
    }

    /// Prepend to a bounded most-recent-first list.
    pub(crate) async fn lpush_trimmed(
        &self,
        key: &str,
        entry: &str,
        keep: usize,
        ttl: Duration,
    ) -> Result<()> {
        let mut conn = self.connection();
        let _: () = redis::pipe()
            .lpush(key, entry)
            .ignore()
            .ltrim(key, 0, keep as isize - 1)
            .ignore()
            .expire(key, ttl.as_secs() as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(GateError::Redis)?;
        Ok(())
    }

    /// Read a bounded recent list, most recent first.
    pub(crate) async fn lrange_all(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection();
        let entries: Vec<String> = conn.lrange(key, 0, -1).await.map_err(GateError::Redis)?;
        Ok(entries)
    }

    /// Delete keys.
    pub(crate) async fn delete_keys(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection();
        let _: () = conn.del(keys.to_vec()).await.map_err(GateError::Redis)?;
        Ok(())
    }
}
