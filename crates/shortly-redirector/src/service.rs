use std::sync::Arc;

use crate::redirector::Redirector;
use crate::side_effects::{SideEffect, SideEffects};
use crate::{RedirectError, Result};
use async_trait::async_trait;
use jiff::Timestamp;
use shortly_core::{cache_ttl, ReadRepository, Slug, UrlCache};
use tracing::{debug, trace, warn};

/// Resolves slugs for redirects.
///
/// The URL cache is consulted first; cache failures degrade to a storage
/// lookup. Access counting and cache population are queued on
/// [`SideEffects`] and never block the caller.
#[derive(Clone)]
pub struct RedirectorService {
    repository: Arc<dyn ReadRepository>,
    cache: Arc<dyn UrlCache>,
    side_effects: Arc<SideEffects>,
}

impl std::fmt::Debug for RedirectorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectorService")
            .field("side_effects", &self.side_effects)
            .finish_non_exhaustive()
    }
}

impl RedirectorService {
    pub fn new(
        repository: Arc<dyn ReadRepository>,
        cache: Arc<dyn UrlCache>,
        side_effects: Arc<SideEffects>,
    ) -> Self {
        Self {
            repository,
            cache,
            side_effects,
        }
    }

    pub fn side_effects(&self) -> &Arc<SideEffects> {
        &self.side_effects
    }

    fn record_access(&self, slug: &Slug) {
        self.side_effects
            .try_submit(SideEffect::CountAccess(slug.clone()));
        self.side_effects
            .try_submit(SideEffect::TouchRecent(slug.clone()));
    }
}

#[async_trait]
impl Redirector for RedirectorService {
    async fn resolve(&self, slug: &Slug) -> Result<String> {
        let now = Timestamp::now();

        match self.cache.get_url(slug).await {
            Ok(Some(record)) => {
                let expired = record.expires_at.is_some_and(|at| now >= at);
                if !expired {
                    trace!(slug = %slug, "resolved from cache");
                    self.record_access(slug);
                    return Ok(record.original_url);
                }
                trace!(slug = %slug, "cached record has expired");
            }
            Ok(None) => trace!(slug = %slug, "url cache miss"),
            Err(e) => warn!(slug = %slug, error = %e, "url cache lookup failed, using storage"),
        }

        let Some(url) = self.repository.get_by_slug(slug).await? else {
            trace!(slug = %slug, "slug not found");
            return Err(RedirectError::NotFound(slug.clone()));
        };

        if url.is_expired_at(now) {
            debug!(slug = %slug, "short url has expired");
            return Err(RedirectError::NotFound(slug.clone()));
        }

        if let Some(ttl) = cache_ttl(url.expires_at, now) {
            self.side_effects.try_submit(SideEffect::CacheUrl {
                slug: slug.clone(),
                record: url.record(),
                ttl,
            });
        }
        self.record_access(slug);

        debug!(slug = %slug, "resolved from storage");
        Ok(url.original_url)
    }
}
