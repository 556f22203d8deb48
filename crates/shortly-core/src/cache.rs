use crate::error::CacheError;
use crate::model::UrlRecord;
use crate::slug::Slug;
use async_trait::async_trait;
use jiff::Timestamp;
use std::time::Duration;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// TTL used for records that never expire.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Floor applied to TTLs derived from an expiry, so that records close to
/// expiring are not re-fetched on every request.
pub const MIN_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// A cache for URL records keyed by [`Slug`].
///
/// Implementations can use Redis, in-memory caches, or other backends.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get URL record from cache.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_url(&self, slug: &Slug) -> Result<Option<UrlRecord>>;

    /// Store URL record in cache for `ttl`.
    async fn set_url(&self, slug: &Slug, record: &UrlRecord, ttl: Duration) -> Result<()>;

    /// Remove URL record from cache.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, slug: &Slug) -> Result<()>;
}

/// Computes how long a record may stay cached.
///
/// Returns `None` when the record is already expired and must not be cached.
pub fn cache_ttl(expires_at: Option<Timestamp>, now: Timestamp) -> Option<Duration> {
    let Some(expires_at) = expires_at else {
        return Some(DEFAULT_CACHE_TTL);
    };

    let remaining = now.duration_until(expires_at);
    if remaining.is_negative() || remaining.is_zero() {
        return None;
    }

    let remaining = Duration::try_from(remaining).ok()?;
    Some(remaining.max(MIN_CACHE_TTL))
}
