use crate::error::StorageError;
use crate::model::{NewShortUrl, ShortUrl, UpdateShortUrl};
use crate::slug::Slug;
use async_trait::async_trait;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A read-only view of the short URL store.
///
/// The redirect path only needs these operations, so it is written against
/// this trait rather than [`Repository`].
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the record for a slug.
    ///
    /// Returns `None` if the slug does not exist. Expired records are
    /// returned as-is; callers decide what expiry means for them.
    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<ShortUrl>>;

    /// Retrieves a record by its numeric id.
    async fn get(&self, id: u64) -> Result<Option<ShortUrl>>;

    /// Lists every record owned by `user_id`, oldest first.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<ShortUrl>>;

    /// Checks whether a slug is already taken.
    async fn slug_exists(&self, slug: &Slug) -> Result<bool>;
}

#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new record. Returns `Err(Conflict)` if the slug is taken.
    async fn create(&self, input: NewShortUrl) -> Result<ShortUrl>;

    /// Applies a partial update. Returns `Err(NotFound)` for an unknown id.
    async fn update(&self, id: u64, input: UpdateShortUrl) -> Result<ShortUrl>;

    /// Deletes a record. Returns `true` if the record existed and was removed.
    async fn delete(&self, id: u64) -> Result<bool>;
}

/// The durable side of access counting.
///
/// The increment is additive: calling it twice with the same delta adds it
/// twice. There is no deduplication.
#[async_trait]
pub trait AccessCountSink: Send + Sync + 'static {
    /// Adds `delta` to the persisted `access_count` of the row for `slug`.
    ///
    /// Returns `Err(NotFound)` if no row has that slug.
    async fn increment_access_count(&self, slug: &Slug, delta: u64) -> Result<()>;
}
