//! Core types and traits for the Shortly URL shortener.
//!
//! This crate holds the domain model shared by every service in the
//! workspace: validated slugs, short URL records, the error taxonomy, and
//! the collaborator traits that the redirect path and the access-count
//! reconciliation worker are written against.

pub mod cache;
pub mod counter;
pub mod error;
pub mod model;
pub mod repository;
pub mod retry;
pub mod slug;

pub use cache::{cache_ttl, UrlCache, DEFAULT_CACHE_TTL, MIN_CACHE_TTL};
pub use counter::{counter_key, slug_from_key, CounterStore, ACCESS_KEY_PREFIX};
pub use error::{CacheError, CoreError, ErrorKind, StorageError};
pub use model::{NewShortUrl, ShortUrl, UpdateShortUrl, UrlRecord};
pub use repository::{AccessCountSink, ReadRepository, Repository};
pub use retry::{retry, retry_if, Backoff, RetryPolicy};
pub use slug::Slug;
