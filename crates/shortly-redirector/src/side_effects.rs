use parking_lot::Mutex;
use shortly_cache::RecentUrls;
use shortly_core::{CounterStore, Slug, UrlCache, UrlRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

/// Work deferred off the redirect path.
#[derive(Debug, Clone)]
pub enum SideEffect {
    /// Add one to the slug's access counter.
    CountAccess(Slug),
    /// Store a resolved record in the URL cache.
    CacheUrl {
        slug: Slug,
        record: UrlRecord,
        ttl: Duration,
    },
    /// Move the slug to the front of the recent list.
    TouchRecent(Slug),
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct SideEffectsConfig {
    /// Jobs that may wait in the queue before new ones are dropped.
    #[builder(default = 1024)]
    pub capacity: usize,
    /// How long [`SideEffects::shutdown`] waits for queued jobs.
    #[builder(default = Duration::from_secs(5))]
    pub drain_timeout: Duration,
}

impl Default for SideEffectsConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

struct Executor {
    cache: Arc<dyn UrlCache>,
    counters: Arc<dyn CounterStore>,
    recent: Option<RecentUrls>,
}

impl Executor {
    async fn run(&self, effect: SideEffect) {
        match effect {
            SideEffect::CountAccess(slug) => match self.counters.increment(&slug).await {
                Ok(value) => debug!(slug = %slug, value, "counted access"),
                Err(e) => warn!(slug = %slug, error = %e, "failed to count access"),
            },
            SideEffect::CacheUrl { slug, record, ttl } => {
                match self.cache.set_url(&slug, &record, ttl).await {
                    Ok(()) => debug!(slug = %slug, ttl_secs = ttl.as_secs(), "populated url cache"),
                    Err(e) => warn!(slug = %slug, error = %e, "failed to populate url cache"),
                }
            }
            SideEffect::TouchRecent(slug) => {
                let Some(recent) = &self.recent else {
                    return;
                };
                if let Err(e) = recent.touch(&slug).await {
                    warn!(slug = %slug, error = %e, "failed to update recent urls");
                }
            }
        }
    }
}

/// A bounded queue of [`SideEffect`]s drained by one background task.
///
/// Submitting never blocks. When the queue is full the job is dropped and
/// logged, so a slow Redis costs counts rather than redirect latency.
pub struct SideEffects {
    sender: Mutex<Option<mpsc::Sender<SideEffect>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    drain_timeout: Duration,
    dropped: AtomicU64,
}

impl std::fmt::Debug for SideEffects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideEffects")
            .field("open", &self.sender.lock().is_some())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl SideEffects {
    /// Starts the consumer task. Must be called from within a Tokio runtime.
    pub fn spawn(
        config: SideEffectsConfig,
        cache: Arc<dyn UrlCache>,
        counters: Arc<dyn CounterStore>,
        recent: Option<RecentUrls>,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel(config.capacity.max(1));
        let executor = Executor {
            cache,
            counters,
            recent,
        };

        let consumer = tokio::spawn(async move {
            while let Some(effect) = rx.recv().await {
                executor.run(effect).await;
            }
            debug!("side effect queue closed");
        });

        Self {
            sender: Mutex::new(Some(tx)),
            consumer: Mutex::new(Some(consumer)),
            drain_timeout: config.drain_timeout,
            dropped: AtomicU64::new(0),
        }
    }

    /// Queues `effect` without waiting. Returns `false` if it was dropped.
    pub fn try_submit(&self, effect: SideEffect) -> bool {
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(?effect, "side effect submitted after shutdown");
            return false;
        };

        match tx.try_send(effect) {
            Ok(()) => true,
            Err(TrySendError::Full(effect)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(?effect, "side effect queue full, dropping job");
                false
            }
            Err(TrySendError::Closed(effect)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(?effect, "side effect consumer is gone, dropping job");
                false
            }
        }
    }

    /// Jobs dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Closes the queue and waits for queued jobs to finish, up to the drain
    /// timeout. Later submissions are dropped. Calling it twice is harmless.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let Some(mut consumer) = self.consumer.lock().take() else {
            return;
        };

        match tokio::time::timeout(self.drain_timeout, &mut consumer).await {
            Ok(Ok(())) => info!("side effects drained"),
            Ok(Err(e)) => warn!(error = %e, "side effect consumer failed"),
            Err(_) => {
                warn!(
                    timeout_ms = self.drain_timeout.as_millis() as u64,
                    "timed out draining side effects, abandoning the rest"
                );
                consumer.abort();
            }
        }
    }
}
