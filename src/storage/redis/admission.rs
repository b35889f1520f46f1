//! Atomic admission and release procedures
//!
//! Both procedures run as server-side Lua scripts. Collapsing check and
//! mutate into one indivisible step is what makes the limiter correct across
//! worker processes without a distributed lock: a naive check-then-increment
//! with two round-trips is racy under concurrent callers.
//!
//! The `redis` client invokes scripts by hash (`EVALSHA`) and, when the
//! server reports the script missing (for example after a restart cleared
//! the script cache), re-registers it and retries the invocation once before
//! surfacing an error.

use super::pool::RedisStore;
use crate::core::store::{AdmissionOutcome, AdmissionRequest, LimiterKeys};
use crate::utils::error::{GateError, Result};
use once_cell::sync::Lazy;
use redis::Script;

/// admit_v1
///
/// KEYS[1] = concurrency counter, KEYS[2] = qpm window, KEYS[3] = stats hash
/// ARGV[1] = concurrency limit, ARGV[2] = qpm limit, ARGV[3] = admission
/// token, ARGV[4] = now (unix seconds), ARGV[5] = window start
///
/// Returns {status, held, in_window} where status is 0 = admitted,
/// 1 = concurrent limit, 2 = qpm limit. Rejections mutate nothing.
const ADMIT_LUA: &str = r#"
redis.call('ZREMRANGEBYSCORE', KEYS[2], '-inf', ARGV[5])
local held = tonumber(redis.call('GET', KEYS[1]) or '0')
if held >= tonumber(ARGV[1]) then
  return {1, held, 0}
end
local in_window = redis.call('ZCARD', KEYS[2])
if in_window >= tonumber(ARGV[2]) then
  return {2, 0, in_window}
end
redis.call('ZADD', KEYS[2], ARGV[4], ARGV[3])
redis.call('EXPIRE', KEYS[2], 120)
held = redis.call('INCR', KEYS[1])
redis.call('EXPIRE', KEYS[1], 300)
redis.call('HINCRBY', KEYS[3], 'total_requests', 1)
return {0, held, in_window + 1}
"#;

/// release_v1
///
/// KEYS[1] = concurrency counter. Decrements, clamping at zero so a double
/// release can never drive the counter negative. Returns the post-decrement
/// value.
const RELEASE_LUA: &str = r#"
local held = redis.call('DECR', KEYS[1])
if held < 0 then
  redis.call('SET', KEYS[1], 0, 'EX', 300)
  return 0
end
return held
"#;

static ADMIT_SCRIPT: Lazy<Script> = Lazy::new(|| Script::new(ADMIT_LUA));
static RELEASE_SCRIPT: Lazy<Script> = Lazy::new(|| Script::new(RELEASE_LUA));

impl RedisStore {
    pub(crate) async fn admit_atomic(
        &self,
        req: &AdmissionRequest<'_>,
    ) -> Result<AdmissionOutcome> {
        let mut conn = self.connection();
        let (status, held, in_window): (i64, i64, i64) = ADMIT_SCRIPT
            .key(&req.keys.concurrent)
            .key(&req.keys.qpm)
            .key(&req.keys.stats)
            .arg(req.concurrency_limit)
            .arg(req.qpm_limit)
            .arg(&req.token)
            .arg(req.now)
            .arg(req.window_start)
            .invoke_async(&mut conn)
            .await
            .map_err(GateError::Redis)?;

        match status {
            0 => Ok(AdmissionOutcome::Admitted {
                concurrent: held,
                in_window,
            }),
            1 => Ok(AdmissionOutcome::ConcurrentLimit { observed: held }),
            2 => Ok(AdmissionOutcome::QpmLimit { observed: in_window }),
            other => Err(GateError::Store(format!(
                "admission script returned unknown status {other}"
            ))),
        }
    }

    pub(crate) async fn release_atomic(&self, keys: &LimiterKeys) -> Result<i64> {
        let mut conn = self.connection();
        let held: i64 = RELEASE_SCRIPT
            .key(&keys.concurrent)
            .invoke_async(&mut conn)
            .await
            .map_err(GateError::Redis)?;
        Ok(held)
    }
}
