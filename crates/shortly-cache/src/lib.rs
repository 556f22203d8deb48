//! Volatile-store adapters for Shortly.
//!
//! Two concerns live here: the URL cache consulted first on every redirect
//! ([`RedisUrlCache`], [`MokaUrlCache`]), and the per-slug access counters
//! that absorb redirect traffic until the reconciliation worker drains them
//! ([`RedisCounterStore`], [`InMemoryCounterStore`]). [`RecentUrls`] keeps a
//! short list of recently resolved slugs.
//!
//! All Redis-backed types take an explicitly constructed connection; there is
//! no process-wide client.

pub mod memory_counter;
pub mod moka;
pub mod recent;
pub mod redis;
pub mod redis_counter;

pub use memory_counter::{CallStats, FailureInjection, InMemoryCounterStore};
pub use self::moka::{MokaCacheConfig, MokaUrlCache};
pub use recent::{RecentUrls, RECENT_LIST_KEY, RECENT_MAX_LEN};
pub use self::redis::RedisUrlCache;
pub use redis_counter::RedisCounterStore;
pub use shortly_core::{CacheError, CounterStore, UrlCache};

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

pub(crate) fn map_redis_error(operation: &str, err: ::redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() || message.to_ascii_lowercase().contains("timed out") {
        CacheError::Timeout(message)
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}
