use shortly_core::{slug_from_key, AccessCountSink, CounterStore, Slug};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::WorkerConfig;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Counter keys found by enumeration.
    pub total_keys: usize,
    /// Keys reconciled successfully, including empty or zero counters.
    pub processed: usize,
    /// Keys whose drain or durable write failed.
    pub failed: usize,
    /// Failed writes whose drained value was put back.
    pub restored: usize,
    /// Failed writes whose drained value could not be put back.
    pub lost: usize,
    /// Keys not dispatched because the pass ran out of time.
    pub skipped: usize,
    pub elapsed: Duration,
    /// Enumeration failed or timed out; nothing was reconciled.
    pub aborted: bool,
}

#[derive(Debug, Default)]
struct Tally {
    processed: AtomicUsize,
    failed: AtomicUsize,
    restored: AtomicUsize,
    lost: AtomicUsize,
}

impl Tally {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Runs passes against one counter store and one durable sink.
pub(crate) struct Reconciler {
    store: Arc<dyn CounterStore>,
    sink: Arc<dyn AccessCountSink>,
    config: WorkerConfig,
}

impl Reconciler {
    pub(crate) fn new(
        store: Arc<dyn CounterStore>,
        sink: Arc<dyn AccessCountSink>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            sink,
            config,
        }
    }

    pub(crate) fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub(crate) async fn run_pass(self: &Arc<Self>) -> PassReport {
        let started = Instant::now();
        let deadline = started + self.config.pass_timeout;

        let keys = match timeout_at(deadline, self.store.list_all_keys()).await {
            Ok(Ok(keys)) => keys,
            Ok(Err(e)) => {
                error!(error = %e, "failed to list access counters, aborting pass");
                return PassReport {
                    aborted: true,
                    elapsed: started.elapsed(),
                    ..PassReport::default()
                };
            }
            Err(_) => {
                error!(
                    timeout_secs = self.config.pass_timeout.as_secs(),
                    "timed out listing access counters, aborting pass"
                );
                return PassReport {
                    aborted: true,
                    elapsed: started.elapsed(),
                    ..PassReport::default()
                };
            }
        };

        let total_keys = keys.len();
        if keys.is_empty() {
            info!("no access counters to reconcile");
            return PassReport {
                elapsed: started.elapsed(),
                ..PassReport::default()
            };
        }

        let tally = Arc::new(Tally::default());
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency()));
        let mut tasks = JoinSet::new();
        let mut dispatched = 0usize;

        for key in keys {
            let permit = if Instant::now() >= deadline {
                None
            } else {
                match timeout_at(deadline, semaphore.clone().acquire_owned()).await {
                    Ok(Ok(permit)) => Some(permit),
                    Ok(Err(_)) | Err(_) => None,
                }
            };
            let Some(permit) = permit else {
                warn!(
                    remaining = total_keys - dispatched,
                    "pass deadline reached, leaving remaining counters for the next pass"
                );
                break;
            };

            let reconciler = Arc::clone(self);
            let tally = Arc::clone(&tally);
            tasks.spawn(async move {
                reconciler.reconcile_key(&key, &tally).await;
                drop(permit);
            });
            dispatched += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "reconciliation task failed");
                Tally::bump(&tally.failed);
            }
        }

        let report = PassReport {
            total_keys,
            processed: tally.processed.load(Ordering::Relaxed),
            failed: tally.failed.load(Ordering::Relaxed),
            restored: tally.restored.load(Ordering::Relaxed),
            lost: tally.lost.load(Ordering::Relaxed),
            skipped: total_keys - dispatched,
            elapsed: started.elapsed(),
            aborted: false,
        };

        info!(
            processed = report.processed,
            failed = report.failed,
            restored = report.restored,
            lost = report.lost,
            skipped = report.skipped,
            keys_count = report.total_keys,
            duration_ms = report.elapsed.as_millis() as u64,
            "access count reconciliation finished"
        );
        report
    }

    /// Drains one counter into the durable sink.
    ///
    /// Not bounded by the pass deadline: a drain that has been sent may
    /// already have removed the value server side, so dropping it would lose
    /// the count. The drained value is always written or restored.
    async fn reconcile_key(&self, key: &str, tally: &Tally) {
        let Some(slug) = slug_from_key(key) else {
            warn!(key, "counter key has no slug, skipping");
            Tally::bump(&tally.failed);
            return;
        };
        let slug = Slug::new_unchecked(slug);

        let count = match self.store.drain(key).await {
            Ok(Some(count)) => count,
            Ok(None) => {
                trace!(slug = %slug, "counter already drained");
                Tally::bump(&tally.processed);
                return;
            }
            Err(e) => {
                warn!(slug = %slug, error = %e, "failed to drain access counter");
                Tally::bump(&tally.failed);
                return;
            }
        };

        if count <= 0 {
            if count < 0 {
                warn!(slug = %slug, count, "discarded negative access counter");
            }
            Tally::bump(&tally.processed);
            return;
        }

        let delta = count.unsigned_abs();
        let Err(sink_error) = self.sink.increment_access_count(&slug, delta).await else {
            debug!(slug = %slug, count, "persisted access count");
            Tally::bump(&tally.processed);
            return;
        };

        Tally::bump(&tally.failed);
        warn!(
            slug = %slug,
            count,
            error = %sink_error,
            "failed to persist access count, restoring counter"
        );

        match self.store.restore(key, count).await {
            Ok(()) => Tally::bump(&tally.restored),
            Err(e) => {
                error!(
                    slug = %slug,
                    key,
                    count,
                    error = %e,
                    sink_error = %sink_error,
                    "critical: failed to restore counter after sink failure"
                );
                Tally::bump(&tally.lost);
            }
        }
    }
}
