//! Redis-based viewer counting
//!
//! All three counters of a session live in one hash. Join and leave run as
//! Lua scripts, so the increment (or clamped decrement) and the peak raise
//! happen in a single server-side step; concurrent viewers cannot lose a
//! higher peak written by someone else.

use crate::db::ViewerCounterStore;
use crate::error::Result;
use crate::models::ViewerCounts;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::{aio::ConnectionManager, AsyncCommands, Script};

/// Counters outlive a forgotten session by at most a day
const COUNTER_TTL_SECS: i64 = 86_400;

static JOIN_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local current = redis.call('HINCRBY', KEYS[1], 'current', 1)
        local total = redis.call('HINCRBY', KEYS[1], 'total', 1)
        local peak = tonumber(redis.call('HGET', KEYS[1], 'peak') or '0')
        if current > peak then
            peak = current
            redis.call('HSET', KEYS[1], 'peak', peak)
        end
        redis.call('EXPIRE', KEYS[1], ARGV[1])
        return {current, peak, total}
        "#,
    )
});

static LEAVE_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local current = tonumber(redis.call('HGET', KEYS[1], 'current') or '0')
        if current > 0 then
            current = redis.call('HINCRBY', KEYS[1], 'current', -1)
        else
            current = 0
            redis.call('HSET', KEYS[1], 'current', 0)
        end
        local peak = tonumber(redis.call('HGET', KEYS[1], 'peak') or '0')
        if current > peak then
            peak = current
            redis.call('HSET', KEYS[1], 'peak', peak)
        end
        local total = tonumber(redis.call('HGET', KEYS[1], 'total') or '0')
        redis.call('EXPIRE', KEYS[1], ARGV[1])
        return {current, peak, total}
        "#,
    )
});

fn counter_key(session_id: &str) -> String {
    format!("broadcast:session:{}:viewers", session_id)
}

fn counts_from((current, peak, total): (i64, i64, i64)) -> ViewerCounts {
    let current = current.max(0);
    ViewerCounts {
        current,
        peak: peak.max(current),
        total: total.max(0),
    }
}

/// Viewer counter using Redis
#[derive(Clone)]
pub struct RedisViewerCounter {
    redis: ConnectionManager,
}

impl RedisViewerCounter {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl ViewerCounterStore for RedisViewerCounter {
    async fn record_join(&self, session_id: &str) -> Result<ViewerCounts> {
        let mut conn = self.redis.clone();
        let raw: (i64, i64, i64) = JOIN_SCRIPT
            .key(counter_key(session_id))
            .arg(COUNTER_TTL_SECS)
            .invoke_async(&mut conn)
            .await?;
        Ok(counts_from(raw))
    }

    async fn record_leave(&self, session_id: &str) -> Result<ViewerCounts> {
        let mut conn = self.redis.clone();
        let raw: (i64, i64, i64) = LEAVE_SCRIPT
            .key(counter_key(session_id))
            .arg(COUNTER_TTL_SECS)
            .invoke_async(&mut conn)
            .await?;
        Ok(counts_from(raw))
    }

    async fn counts(&self, session_id: &str) -> Result<ViewerCounts> {
        let mut conn = self.redis.clone();
        let (current, peak, total): (Option<i64>, Option<i64>, Option<i64>) = redis::cmd("HMGET")
            .arg(counter_key(session_id))
            .arg(&["current", "peak", "total"])
            .query_async(&mut conn)
            .await?;
        Ok(counts_from((
            current.unwrap_or(0),
            peak.unwrap_or(0),
            total.unwrap_or(0),
        )))
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(counter_key(session_id)).await?;
        Ok(())
    }
}
