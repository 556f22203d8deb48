use crate::error::CacheError;
use crate::slug::Slug;
use async_trait::async_trait;

/// Result type for counter store operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Prefix of every access counter key in the volatile store.
pub const ACCESS_KEY_PREFIX: &str = "access:";

/// Builds the counter key for a slug.
pub fn counter_key(slug: &Slug) -> String {
    format!("{ACCESS_KEY_PREFIX}{}", slug.as_str())
}

/// Extracts the slug part of a counter key.
///
/// Returns `None` if the key does not carry the counter prefix or the slug
/// part is empty.
pub fn slug_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(ACCESS_KEY_PREFIX)
        .filter(|slug| !slug.is_empty())
}

/// The volatile per-slug access counters.
///
/// Every operation is atomic on a single key. Counters are created by
/// [`increment`](CounterStore::increment) and removed only by
/// [`drain`](CounterStore::drain).
#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    /// Increments the counter for `slug`, creating it at zero if absent, and
    /// returns the new value.
    async fn increment(&self, slug: &Slug) -> Result<u64>;

    /// Enumerates every counter key.
    ///
    /// The enumeration is an approximate sweep: keys created or drained while
    /// it runs may or may not be included. The result has no duplicates.
    async fn list_all_keys(&self) -> Result<Vec<String>>;

    /// Reads and removes a counter in one step.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn drain(&self, key: &str) -> Result<Option<i64>>;

    /// Adds `count` back onto a counter, recreating it if absent.
    async fn restore(&self, key: &str, count: i64) -> Result<()>;
}
