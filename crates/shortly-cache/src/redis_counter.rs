use async_trait::async_trait;
use redis::AsyncCommands;
use shortly_core::{counter_key, retry_if, CounterStore, RetryPolicy, Slug, ACCESS_KEY_PREFIX};
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::{map_redis_error, CacheError, Result};

const DEFAULT_SCAN_COUNT: usize = 100;

/// Access counters kept as plain Redis integers under `access:<slug>`.
///
/// Increments go through INCR. INCR is not idempotent, so only connection
/// refusals are retried per the configured [`RetryPolicy`]: any other failure
/// may have been applied server side and is returned without a retry.
/// Draining uses GETDEL so that a read and a delete cannot
/// interleave with a concurrent increment.
#[derive(Debug, Clone)]
pub struct RedisCounterStore {
    conn: redis::aio::MultiplexedConnection,
    retry: RetryPolicy,
    scan_count: usize,
}

impl RedisCounterStore {
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self {
            conn,
            retry: RetryPolicy::default(),
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }

    /// Replaces the retry policy used by [`CounterStore::increment`].
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the COUNT hint passed to each SCAN page.
    pub fn with_scan_count(mut self, scan_count: usize) -> Self {
        self.scan_count = scan_count.max(1);
        self
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, slug: &Slug) -> Result<u64> {
        if slug.as_str().is_empty() {
            return Err(CacheError::InvalidKey("slug must not be empty".to_string()));
        }
        let key = counter_key(slug);

        let value: i64 = retry_if(
            &self.retry,
            "increment access counter",
            redis::RedisError::is_connection_refusal,
            || {
                let mut conn = self.conn.clone();
                let key = key.clone();
                async move { conn.incr::<_, _, i64>(&key, 1).await }
            },
        )
        .await
        .map_err(|e| map_redis_error("failed to increment access counter", e))?;

        trace!(slug = %slug, value, "incremented access counter");
        Ok(u64::try_from(value).unwrap_or(0))
    }

    async fn list_all_keys(&self) -> Result<Vec<String>> {
        let pattern = format!("{ACCESS_KEY_PREFIX}*");
        let mut conn = self.conn.clone();
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        let mut pages = 0usize;

        loop {
            let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(self.scan_count)
                .query_async(&mut conn)
                .await
                .map_err(|e| map_redis_error("failed to scan access counters", e))?;
            pages += 1;

            // SCAN may return a key more than once across pages.
            for key in page {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(keys = keys.len(), pages, "scanned access counters");
        Ok(keys)
    }

    async fn drain(&self, key: &str) -> Result<Option<i64>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to drain access counter", e))?;

        raw.map(|value| {
            value.parse::<i64>().map_err(|e| {
                CacheError::InvalidData(format!("counter '{key}' holds non-integer '{value}': {e}"))
            })
        })
        .transpose()
    }

    async fn restore(&self, key: &str, count: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .incr(key, count)
            .await
            .map_err(|e| map_redis_error("failed to restore access counter", e))?;
        trace!(key, count, "restored access counter");
        Ok(())
    }
}
