use shortly_core::{ReadRepository, Slug, StorageError};
use thiserror::Error;
use tracing::debug;

use crate::{Generator, RandomSlugGenerator};

/// Candidates tried before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no free slug found after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, GenerateError>;

/// Picks a slug that is not taken yet.
///
/// The check is advisory: a concurrent insert can still claim the slug, so
/// callers must handle [`StorageError::Conflict`] on create.
#[derive(Debug, Clone)]
pub struct SlugAllocator<G = RandomSlugGenerator> {
    generator: G,
    max_attempts: u32,
}

impl Default for SlugAllocator {
    fn default() -> Self {
        Self::new(RandomSlugGenerator::default())
    }
}

impl<G: Generator> SlugAllocator<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn allocate<R>(&self, repo: &R) -> Result<Slug>
    where
        R: ReadRepository + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = self.generator.generate();
            if !repo.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
            debug!(slug = %candidate, attempt, "generated slug already taken");
        }

        Err(GenerateError::Exhausted {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortly_core::{NewShortUrl, Repository};
    use shortly_storage::InMemoryRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed list of slugs, repeating the last one.
    struct Sequence {
        slugs: Vec<&'static str>,
        next: AtomicUsize,
    }

    impl Sequence {
        fn new(slugs: Vec<&'static str>) -> Self {
            Self {
                slugs,
                next: AtomicUsize::new(0),
            }
        }
    }

    impl Generator for Sequence {
        fn generate(&self) -> Slug {
            let i = self.next.fetch_add(1, Ordering::SeqCst).min(self.slugs.len() - 1);
            Slug::new_unchecked(self.slugs[i])
        }
    }

    async fn repo_with(slugs: &[&str]) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for s in slugs {
            repo.create(NewShortUrl {
                slug: Slug::new_unchecked(*s),
                original_url: "https://example.com".to_string(),
                user_id: "user-1".to_string(),
                expires_at: None,
            })
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn skips_taken_slugs() {
        let repo = repo_with(&["taken1", "taken2"]).await;
        let allocator = SlugAllocator::new(Sequence::new(vec!["taken1", "taken2", "free01"]));

        let slug = allocator.allocate(&repo).await.unwrap();
        assert_eq!(slug.as_str(), "free01");
    }

    #[tokio::test]
    async fn gives_up_after_five_collisions() {
        let repo = repo_with(&["taken1"]).await;
        let allocator = SlugAllocator::new(Sequence::new(vec!["taken1"]));

        let err = allocator.allocate(&repo).await.unwrap_err();
        assert!(matches!(err, GenerateError::Exhausted { attempts: 5 }));
    }

    #[tokio::test]
    async fn default_allocator_finds_a_free_slug() {
        let repo = InMemoryRepository::new();
        let slug = SlugAllocator::default().allocate(&repo).await.unwrap();
        assert_eq!(slug.as_str().len(), 10);
    }
}
