//! Redis Store Module
//!
//! [`KeyValueStore`] over a Redis-protocol server. The multiplexed connection
//! is opened on first use, shared by every request, and only rebuilt after a
//! connection-level failure.

use std::future::Future;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, IntoConnectionInfo, RedisResult, Script};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::{KeyValueStore, WindowCount};

/// Keys scanned per SCAN round trip during pattern invalidation.
const SCAN_BATCH: usize = 100;

/// Sliding-log admission over a sorted set of admission timestamps.
///
/// KEYS[1] = log key, KEYS[2] = member counter; ARGV = now_ms, window_ms, limit.
/// Members come from the server-side counter so every process sharing the
/// store adds distinct entries. Returns {admitted, count, oldest_ms}.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local seq_key = KEYS[2]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])

redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window)
local count = redis.call('ZCARD', key)
local admitted = 0
if count < limit then
    local seq = redis.call('INCR', seq_key)
    redis.call('ZADD', key, now, ARGV[1] .. '-' .. seq)
    count = count + 1
    admitted = 1
end
redis.call('PEXPIRE', key, window)
redis.call('PEXPIRE', seq_key, window)

local oldest = now
local first = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
if first[2] then
    oldest = tonumber(first[2])
end
return {admitted, count, oldest}
"#;

/// Counter key that numbers the members of one admission log.
fn window_seq_key(key: &str) -> String {
    format!("{}:seq", key)
}

// == Redis Store ==
pub struct RedisStore {
    client: Client,
    conn: RwLock<Option<MultiplexedConnection>>,
    window_script: Script,
}

impl RedisStore {
    // == Constructor ==
    /// Builds a client from a URL and an optional access token.
    ///
    /// No connection is attempted here; invalid URLs fail immediately.
    pub fn open(url: &str, token: Option<&str>) -> StoreResult<Self> {
        let mut info = url
            .into_connection_info()
            .map_err(|e| StoreError::Unavailable(format!("invalid store URL: {}", e)))?;
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            info.redis.password = Some(token.to_string());
        }

        let client = Client::open(info)
            .map_err(|e| StoreError::Unavailable(format!("client error: {}", e)))?;

        Ok(Self {
            client,
            conn: RwLock::new(None),
            window_script: Script::new(SLIDING_WINDOW_SCRIPT),
        })
    }

    // == Connection ==
    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        if let Some(conn) = self.conn.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut guard = self.conn.write().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        debug!("Opening store connection");
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Runs one command, dropping the shared connection on transport errors.
    async fn run<T, F, Fut>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut + Send,
        Fut: Future<Output = RedisResult<T>> + Send,
        T: Send,
    {
        let conn = self.connection().await?;
        match op(conn).await {
            Ok(value) => Ok(value),
            Err(err) => {
                let err = StoreError::from(err);
                if matches!(err, StoreError::Connection(_)) {
                    warn!("Resetting store connection after: {}", err);
                    *self.conn.write().await = None;
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.run(|mut conn| async move {
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()> {
        self.run(|mut conn| async move {
            let _: () = conn.set_ex(key, value, ttl_secs).await?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.run(|mut conn| async move {
            let removed: i64 = conn.del(key).await?;
            Ok(removed > 0)
        })
        .await
    }

    async fn delete_matching(&self, pattern: &str) -> StoreResult<usize> {
        self.run(|mut conn| async move {
            let mut cursor: u64 = 0;
            let mut removed: usize = 0;

            loop {
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut conn)
                    .await?;

                if !keys.is_empty() {
                    let count: i64 = conn.del(keys).await?;
                    removed += count.max(0) as usize;
                }

                if next == 0 {
                    break;
                }
                cursor = next;
            }

            Ok(removed)
        })
        .await
    }

    async fn sliding_window(
        &self,
        key: &str,
        limit: u64,
        window_ms: u64,
        now_ms: u64,
    ) -> StoreResult<WindowCount> {
        let seq_key = window_seq_key(key);
        let script = &self.window_script;

        let (admitted, count, oldest): (i64, i64, i64) = self
            .run(|mut conn| async move {
                let mut invocation = script.key(key);
                invocation.key(seq_key).arg(now_ms).arg(window_ms).arg(limit);
                invocation.invoke_async(&mut conn).await
            })
            .await?;

        Ok(WindowCount {
            admitted: admitted == 1,
            count: count.max(0) as u64,
            oldest_ms: oldest.max(0) as u64,
        })
    }
}
