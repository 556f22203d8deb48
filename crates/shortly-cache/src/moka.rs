use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use shortly_core::{Slug, UrlCache, UrlRecord};
use std::time::{Duration, Instant};
use tracing::trace;
use typed_builder::TypedBuilder;

use crate::Result;

#[derive(Debug, Clone)]
struct Entry {
    record: UrlRecord,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _now: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _now: Instant,
        _current: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Settings for [`MokaUrlCache`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct MokaCacheConfig {
    /// Maximum number of entries the cache can hold.
    #[builder(default = 10_000)]
    pub max_capacity: u64,
}

impl Default for MokaCacheConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// An in-process [`UrlCache`] backed by Moka.
///
/// Used by the in-memory deployment and by tests. Every entry honours the TTL
/// passed to [`set_url`](UrlCache::set_url).
#[derive(Clone)]
pub struct MokaUrlCache {
    cache: Cache<String, Entry>,
}

impl std::fmt::Debug for MokaUrlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaUrlCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl MokaUrlCache {
    pub fn new() -> Self {
        Self::from(MokaCacheConfig::default())
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl From<MokaCacheConfig> for MokaUrlCache {
    fn from(config: MokaCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get_url(&self, slug: &Slug) -> Result<Option<UrlRecord>> {
        let hit = self.cache.get(slug.as_str()).await.map(|entry| entry.record);
        trace!(slug = %slug, hit = hit.is_some(), "moka lookup");
        Ok(hit)
    }

    async fn set_url(&self, slug: &Slug, record: &UrlRecord, ttl: Duration) -> Result<()> {
        let entry = Entry {
            record: record.clone(),
            ttl,
        };
        self.cache.insert(slug.as_str().to_string(), entry).await;
        Ok(())
    }

    async fn del(&self, slug: &Slug) -> Result<()> {
        self.cache.invalidate(slug.as_str()).await;
        Ok(())
    }
}
