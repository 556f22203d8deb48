use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use shortly_core::repository::Result;
use shortly_core::{
    AccessCountSink, NewShortUrl, ReadRepository, Repository, ShortUrl, Slug, StorageError,
    UpdateShortUrl,
};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use tracing::trace;

/// An in-process repository backed by [`DashMap`].
///
/// Used by the in-memory deployment and as the durable sink in tests. Sink
/// writes can be made to fail on demand with
/// [`fail_sink_writes`](Self::fail_sink_writes).
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    rows: DashMap<u64, ShortUrl>,
    by_slug: DashMap<String, u64>,
    next_id: AtomicU64,
    sink_failures: AtomicU32,
    sink_calls: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls to
    /// [`increment_access_count`](AccessCountSink::increment_access_count)
    /// fail with [`StorageError::Unavailable`].
    pub fn fail_sink_writes(&self, n: u32) {
        self.sink_failures.store(n, Ordering::SeqCst);
    }

    /// Number of sink writes attempted so far, failed ones included.
    pub fn sink_calls(&self) -> usize {
        self.sink_calls.load(Ordering::SeqCst)
    }

    /// Persisted access count for `slug`, if the row exists.
    pub fn access_count(&self, slug: &str) -> Option<u64> {
        let id = *self.by_slug.get(slug)?;
        self.rows.get(&id).map(|row| row.access_count)
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<ShortUrl>> {
        let Some(id) = self.by_slug.get(slug.as_str()).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.rows.get(&id).map(|row| row.clone()))
    }

    async fn get(&self, id: u64) -> Result<Option<ShortUrl>> {
        Ok(self.rows.get(&id).map(|row| row.clone()))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<ShortUrl>> {
        let mut rows: Vec<ShortUrl> = self
            .rows
            .iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| row.clone())
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    async fn slug_exists(&self, slug: &Slug) -> Result<bool> {
        Ok(self.by_slug.contains_key(slug.as_str()))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create(&self, input: NewShortUrl) -> Result<ShortUrl> {
        let id = match self.by_slug.entry(input.slug.as_str().to_string()) {
            Entry::Occupied(_) => return Err(StorageError::Conflict(input.slug.to_string())),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                slot.insert(id);
                id
            }
        };

        let row = ShortUrl {
            id,
            slug: input.slug,
            original_url: input.original_url,
            user_id: input.user_id,
            created_at: Timestamp::now(),
            expires_at: input.expires_at,
            access_count: 0,
        };
        self.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: u64, input: UpdateShortUrl) -> Result<ShortUrl> {
        let mut row = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("short url {id}")))?;

        if let Some(slug) = input.slug {
            if slug != row.slug {
                match self.by_slug.entry(slug.as_str().to_string()) {
                    Entry::Occupied(_) => return Err(StorageError::Conflict(slug.to_string())),
                    Entry::Vacant(slot) => {
                        slot.insert(id);
                    }
                }
                self.by_slug.remove(row.slug.as_str());
                row.slug = slug;
            }
        }
        if let Some(original_url) = input.original_url {
            row.original_url = original_url;
        }
        if let Some(expires_at) = input.expires_at {
            row.expires_at = Some(expires_at);
        }

        Ok(row.clone())
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let Some((_, row)) = self.rows.remove(&id) else {
            return Ok(false);
        };
        self.by_slug.remove(row.slug.as_str());
        Ok(true)
    }
}

#[async_trait]
impl AccessCountSink for InMemoryRepository {
    async fn increment_access_count(&self, slug: &Slug, delta: u64) -> Result<()> {
        self.sink_calls.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .sink_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StorageError::Unavailable("injected sink failure".to_string()));
        }

        let id = self
            .by_slug
            .get(slug.as_str())
            .map(|id| *id)
            .ok_or_else(|| StorageError::NotFound(slug.to_string()))?;
        let mut row = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(slug.to_string()))?;
        row.access_count += delta;

        trace!(slug = %slug, delta, total = row.access_count, "persisted access count");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(s: &str) -> Slug {
        Slug::new_unchecked(s)
    }

    fn new_url(s: &str) -> NewShortUrl {
        NewShortUrl {
            slug: slug(s),
            original_url: format!("https://example.com/{s}"),
            user_id: "user-1".to_string(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn create_and_look_up() {
        let repo = InMemoryRepository::new();
        let created = repo.create(new_url("abc123")).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.access_count, 0);
        assert_eq!(
            repo.get_by_slug(&slug("abc123")).await.unwrap(),
            Some(created.clone())
        );
        assert_eq!(repo.get(1).await.unwrap(), Some(created));
        assert!(repo.slug_exists(&slug("abc123")).await.unwrap());
        assert!(repo.get_by_slug(&slug("nope00")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_slug_conflicts() {
        let repo = InMemoryRepository::new();
        repo.create(new_url("abc123")).await.unwrap();
        let err = repo.create(new_url("abc123")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_moves_slug_index() {
        let repo = InMemoryRepository::new();
        let row = repo.create(new_url("old123")).await.unwrap();
        repo.create(new_url("taken1")).await.unwrap();

        let err = repo
            .update(
                row.id,
                UpdateShortUrl {
                    slug: Some(slug("taken1")),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let updated = repo
            .update(
                row.id,
                UpdateShortUrl {
                    slug: Some(slug("new123")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, slug("new123"));
        assert!(!repo.slug_exists(&slug("old123")).await.unwrap());
        assert!(repo.slug_exists(&slug("new123")).await.unwrap());

        let err = repo.update(99, UpdateShortUrl::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_frees_the_slug() {
        let repo = InMemoryRepository::new();
        let row = repo.create(new_url("abc123")).await.unwrap();

        assert!(repo.delete(row.id).await.unwrap());
        assert!(!repo.delete(row.id).await.unwrap());
        assert!(!repo.slug_exists(&slug("abc123")).await.unwrap());
    }

    #[tokio::test]
    async fn list_by_user_is_ordered() {
        let repo = InMemoryRepository::new();
        for s in ["aaa111", "bbb222", "ccc333"] {
            repo.create(new_url(s)).await.unwrap();
        }
        let mut other = new_url("ddd444");
        other.user_id = "user-2".to_string();
        repo.create(other).await.unwrap();

        let ids: Vec<u64> = repo
            .list_by_user("user-1")
            .await
            .unwrap()
            .iter()
            .map(|row| row.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn sink_is_additive() {
        let repo = InMemoryRepository::new();
        repo.create(new_url("abc123")).await.unwrap();

        repo.increment_access_count(&slug("abc123"), 5).await.unwrap();
        repo.increment_access_count(&slug("abc123"), 5).await.unwrap();
        assert_eq!(repo.access_count("abc123"), Some(10));
    }

    #[tokio::test]
    async fn sink_reports_missing_slug_and_injected_failures() {
        let repo = InMemoryRepository::new();
        repo.create(new_url("abc123")).await.unwrap();

        let err = repo
            .increment_access_count(&slug("nope00"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        repo.fail_sink_writes(1);
        let err = repo
            .increment_access_count(&slug("abc123"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));

        repo.increment_access_count(&slug("abc123"), 1).await.unwrap();
        assert_eq!(repo.access_count("abc123"), Some(1));
        assert_eq!(repo.sink_calls(), 3);
    }
}
