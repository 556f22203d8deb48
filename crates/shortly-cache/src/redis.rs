use async_trait::async_trait;
use redis::AsyncCommands;
use shortly_core::{Slug, UrlCache, UrlRecord};
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::{map_redis_error, CacheError, Result};

/// Prefix of URL cache entries.
pub const URL_KEY_PREFIX: &str = "url:";

/// A Redis-backed [`UrlCache`].
///
/// Records are stored as JSON strings under `url:<slug>` with a per-entry
/// expiry.
#[derive(Debug, Clone)]
pub struct RedisUrlCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

impl RedisUrlCache {
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, URL_KEY_PREFIX)
    }

    /// Uses `key_prefix` instead of `url:`, mostly to isolate tests that
    /// share one server.
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    fn cache_key(&self, slug: &Slug) -> String {
        format!("{}{}", self.key_prefix, slug.as_str())
    }
}

#[async_trait]
impl UrlCache for RedisUrlCache {
    async fn get_url(&self, slug: &Slug) -> Result<Option<UrlRecord>> {
        let key = self.cache_key(slug);
        trace!(slug = %slug, "fetching url record from redis");

        let mut conn = self.conn.clone();
        let cached: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| map_redis_error("failed to fetch url record", e))?;

        let Some(cached) = cached else {
            trace!(slug = %slug, "redis cache miss");
            return Ok(None);
        };

        match serde_json::from_str::<UrlRecord>(&cached) {
            Ok(record) => {
                debug!(slug = %slug, "redis cache hit");
                Ok(Some(record))
            }
            Err(e) => {
                warn!(slug = %slug, error = %e, "cached url record is corrupt");
                Err(CacheError::InvalidData(format!(
                    "invalid cached value for key '{key}': {e}"
                )))
            }
        }
    }

    async fn set_url(&self, slug: &Slug, record: &UrlRecord, ttl: Duration) -> Result<()> {
        let key = self.cache_key(slug);
        let json = serde_json::to_string(record)
            .map_err(|e| CacheError::Serialization(format!("failed to encode url record: {e}")))?;

        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, json, seconds)
            .await
            .map_err(|e| map_redis_error("failed to write url record", e))?;

        debug!(slug = %slug, ttl_secs = seconds, "cached url record in redis");
        Ok(())
    }

    async fn del(&self, slug: &Slug) -> Result<()> {
        let key = self.cache_key(slug);
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| map_redis_error("failed to delete url record", e))?;

        trace!(slug = %slug, "removed url record from redis");
        Ok(())
    }
}
