use async_trait::async_trait;
use parking_lot::Mutex;
use shortly_core::{counter_key, retry, CounterStore, RetryPolicy, Slug, ACCESS_KEY_PREFIX};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use tracing::trace;

use crate::{CacheError, Result};

const SCAN_PAGE: usize = 100;

/// Makes the next N calls of an operation fail with
/// [`CacheError::Unavailable`].
#[derive(Debug, Default)]
pub struct FailureInjection {
    increments: AtomicU32,
    scans: AtomicU32,
    drains: AtomicU32,
    restores: AtomicU32,
}

impl FailureInjection {
    pub fn fail_increments(&self, n: u32) {
        self.increments.store(n, Ordering::SeqCst);
    }

    pub fn fail_scans(&self, n: u32) {
        self.scans.store(n, Ordering::SeqCst);
    }

    pub fn fail_drains(&self, n: u32) {
        self.drains.store(n, Ordering::SeqCst);
    }

    pub fn fail_restores(&self, n: u32) {
        self.restores.store(n, Ordering::SeqCst);
    }

    fn take(slot: &AtomicU32, operation: &str) -> Result<()> {
        let tripped = slot
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(CacheError::Unavailable(format!("injected {operation} failure")))
        } else {
            Ok(())
        }
    }
}

/// Call counts, for assertions in tests.
#[derive(Debug, Default)]
pub struct CallStats {
    pub increments: AtomicUsize,
    pub scan_pages: AtomicUsize,
    pub drains: AtomicUsize,
    pub restores: AtomicUsize,
}

impl CallStats {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// An in-process [`CounterStore`].
///
/// Keys are kept sorted so enumeration can page through them with a numeric
/// cursor the same way SCAN does.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: Mutex<BTreeMap<String, i64>>,
    retry: RetryPolicy,
    pub failures: FailureInjection,
    pub stats: CallStats,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry(retry: RetryPolicy) -> Self {
        Self {
            retry,
            ..Self::default()
        }
    }

    /// Current counter for `slug`, if any.
    pub fn value(&self, slug: &str) -> Option<i64> {
        self.counters
            .lock()
            .get(&format!("{ACCESS_KEY_PREFIX}{slug}"))
            .copied()
    }

    /// Writes a raw key, bypassing the prefix. Lets tests plant foreign keys.
    pub fn insert_raw(&self, key: impl Into<String>, value: i64) {
        self.counters.lock().insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.counters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns up to `count` matching keys starting at `cursor`, and the
    /// cursor for the next page (`0` when exhausted).
    fn scan_page(&self, cursor: usize, count: usize) -> (usize, Vec<String>) {
        let counters = self.counters.lock();
        let matching: Vec<&String> = counters
            .keys()
            .filter(|k| k.starts_with(ACCESS_KEY_PREFIX))
            .collect();

        let end = (cursor + count).min(matching.len());
        let page = matching
            .get(cursor..end)
            .map(|keys| keys.iter().map(|k| (*k).clone()).collect())
            .unwrap_or_default();
        let next = if end >= matching.len() { 0 } else { end };
        (next, page)
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, slug: &Slug) -> Result<u64> {
        if slug.as_str().is_empty() {
            return Err(CacheError::InvalidKey("slug must not be empty".to_string()));
        }
        let key = counter_key(slug);

        let value = retry(&self.retry, "increment access counter", || async {
            self.stats.increments.fetch_add(1, Ordering::SeqCst);
            FailureInjection::take(&self.failures.increments, "increment")?;
            let mut counters = self.counters.lock();
            let value = counters.entry(key.clone()).or_insert(0);
            *value += 1;
            Ok::<_, CacheError>(*value)
        })
        .await?;

        Ok(u64::try_from(value).unwrap_or(0))
    }

    async fn list_all_keys(&self) -> Result<Vec<String>> {
        FailureInjection::take(&self.failures.scans, "scan")?;

        let mut keys = Vec::new();
        let mut cursor = 0;
        loop {
            self.stats.scan_pages.fetch_add(1, Ordering::SeqCst);
            let (next, page) = self.scan_page(cursor, SCAN_PAGE);
            keys.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        trace!(keys = keys.len(), "listed in-memory access counters");
        Ok(keys)
    }

    async fn drain(&self, key: &str) -> Result<Option<i64>> {
        self.stats.drains.fetch_add(1, Ordering::SeqCst);
        FailureInjection::take(&self.failures.drains, "drain")?;
        Ok(self.counters.lock().remove(key))
    }

    async fn restore(&self, key: &str, count: i64) -> Result<()> {
        self.stats.restores.fetch_add(1, Ordering::SeqCst);
        FailureInjection::take(&self.failures.restores, "restore")?;
        *self.counters.lock().entry(key.to_string()).or_insert(0) += count;
        Ok(())
    }
}
