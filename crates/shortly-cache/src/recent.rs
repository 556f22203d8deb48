use redis::AsyncCommands;
use shortly_core::Slug;
use tracing::trace;

use crate::{map_redis_error, Result};

/// Key of the recently-resolved slug list.
pub const RECENT_LIST_KEY: &str = "url:recent";

/// Maximum number of slugs kept in the list.
pub const RECENT_MAX_LEN: usize = 20;

/// Most-recently-resolved slugs, newest first, without duplicates.
#[derive(Debug, Clone)]
pub struct RecentUrls {
    conn: redis::aio::MultiplexedConnection,
    key: String,
}

impl RecentUrls {
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_key(conn, RECENT_LIST_KEY)
    }

    pub fn with_key(conn: redis::aio::MultiplexedConnection, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }

    /// Moves `slug` to the front of the list and trims it to
    /// [`RECENT_MAX_LEN`] entries.
    pub async fn touch(&self, slug: &Slug) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .lrem(&self.key, 0, slug.as_str())
            .ignore()
            .lpush(&self.key, slug.as_str())
            .ignore()
            .ltrim(&self.key, 0, RECENT_MAX_LEN as isize - 1)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to update recent urls", e))?;

        trace!(slug = %slug, "touched recent urls");
        Ok(())
    }

    /// Returns up to `limit` slugs, newest first. `limit` is clamped to
    /// `1..=RECENT_MAX_LEN`.
    pub async fn list(&self, limit: usize) -> Result<Vec<String>> {
        let limit = limit.clamp(1, RECENT_MAX_LEN);
        let mut conn = self.conn.clone();
        conn.lrange(&self.key, 0, limit as isize - 1)
            .await
            .map_err(|e| map_redis_error("failed to read recent urls", e))
    }
}
