use std::sync::Arc;

use jiff::Timestamp;
use shortly_core::{CoreError, ErrorKind, NewShortUrl, Repository, ShortUrl, Slug, StorageError};
use thiserror::Error;
use tracing::{debug, info};

use crate::{GenerateError, Generator, RandomSlugGenerator, SlugAllocator};

/// Creates attempted for a generated slug before a lost race is reported.
const GENERATED_CREATE_ATTEMPTS: u32 = 2;

#[derive(Debug, Error)]
pub enum ShortenError {
    #[error(transparent)]
    Invalid(#[from] CoreError),
    #[error("slug already taken: {0}")]
    SlugTaken(Slug),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ShortenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShortenError::Invalid(e) => e.kind(),
            ShortenError::SlugTaken(_) => ErrorKind::AlreadyExists,
            ShortenError::Generate(GenerateError::Storage(e)) | ShortenError::Storage(e) => e.kind(),
            ShortenError::Generate(GenerateError::Exhausted { .. }) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShortenError>;

#[derive(Debug, Clone)]
pub struct ShortenRequest {
    pub original_url: String,
    /// Owner, as identified by the auth layer.
    pub user_id: String,
    /// Caller-chosen slug; a random one is allocated when absent.
    pub custom_slug: Option<Slug>,
    pub expires_at: Option<Timestamp>,
}

/// Validates shorten requests and persists them under a free slug.
pub struct ShortenerService<G = RandomSlugGenerator> {
    repository: Arc<dyn Repository>,
    allocator: SlugAllocator<G>,
}

impl ShortenerService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self::with_allocator(repository, SlugAllocator::default())
    }
}

impl<G: Generator> ShortenerService<G> {
    pub fn with_allocator(repository: Arc<dyn Repository>, allocator: SlugAllocator<G>) -> Self {
        Self {
            repository,
            allocator,
        }
    }

    fn validate_url(url: &str) -> std::result::Result<(), CoreError> {
        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(CoreError::InvalidUrl(format!(
                "url must have a scheme and host: '{url}'"
            )));
        };
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(CoreError::InvalidUrl(format!(
                "scheme must be http or https, got '{scheme}'"
            )));
        }
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() || url.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidUrl(format!("url has no valid host: '{url}'")));
        }
        Ok(())
    }

    pub async fn shorten(&self, request: ShortenRequest) -> Result<ShortUrl> {
        Self::validate_url(&request.original_url)?;
        if let Some(expires_at) = request.expires_at {
            if expires_at <= Timestamp::now() {
                return Err(CoreError::InvalidExpiry(format!(
                    "expiry {expires_at} is not in the future"
                ))
                .into());
            }
        }

        if let Some(slug) = request.custom_slug.clone() {
            return match self.create(slug.clone(), &request).await {
                Err(StorageError::Conflict(_)) => Err(ShortenError::SlugTaken(slug)),
                other => Ok(other?),
            };
        }

        let mut attempt = 1;
        loop {
            let slug = self.allocator.allocate(self.repository.as_ref()).await?;
            match self.create(slug.clone(), &request).await {
                Err(StorageError::Conflict(_)) if attempt < GENERATED_CREATE_ATTEMPTS => {
                    debug!(slug = %slug, attempt, "generated slug claimed concurrently");
                    attempt += 1;
                }
                other => return Ok(other?),
            }
        }
    }

    async fn create(
        &self,
        slug: Slug,
        request: &ShortenRequest,
    ) -> std::result::Result<ShortUrl, StorageError> {
        let created = self
            .repository
            .create(NewShortUrl {
                slug,
                original_url: request.original_url.clone(),
                user_id: request.user_id.clone(),
                expires_at: request.expires_at,
            })
            .await?;
        info!(slug = %created.slug, user_id = %created.user_id, "short url created");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use shortly_core::ReadRepository;
    use shortly_storage::InMemoryRepository;

    fn request(url: &str) -> ShortenRequest {
        ShortenRequest {
            original_url: url.to_string(),
            user_id: "user-1".to_string(),
            custom_slug: None,
            expires_at: None,
        }
    }

    fn service() -> (Arc<InMemoryRepository>, ShortenerService) {
        let repo = Arc::new(InMemoryRepository::new());
        (repo.clone(), ShortenerService::new(repo))
    }

    #[tokio::test]
    async fn generated_slug_is_persisted() {
        let (repo, service) = service();

        let created = service.shorten(request("https://example.com/a")).await.unwrap();
        assert_eq!(created.slug.as_str().len(), 10);

        let stored = repo.get_by_slug(&created.slug).await.unwrap().unwrap();
        assert_eq!(stored.original_url, "https://example.com/a");
        assert_eq!(stored.user_id, "user-1");
    }

    #[tokio::test]
    async fn custom_slug_conflict_is_reported() {
        let (_, service) = service();
        let mut req = request("https://example.com");
        req.custom_slug = Some(Slug::new("mine01").unwrap());

        service.shorten(req.clone()).await.unwrap();
        let err = service.shorten(req).await.unwrap_err();
        assert!(matches!(err, ShortenError::SlugTaken(ref s) if s.as_str() == "mine01"));
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn rejects_bad_urls() {
        let (_, service) = service();
        for url in ["", "example.com", "ftp://example.com", "https://", "https://a b.com"] {
            let err = service.shorten(request(url)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{url}");
        }
    }

    #[tokio::test]
    async fn rejects_past_expiry() {
        let (_, service) = service();
        let mut req = request("https://example.com");
        req.expires_at = Some(Timestamp::now() - SignedDuration::from_secs(1));

        let err = service.shorten(req).await.unwrap_err();
        assert!(matches!(err, ShortenError::Invalid(CoreError::InvalidExpiry(_))));
    }
}
