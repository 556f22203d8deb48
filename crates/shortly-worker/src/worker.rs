use parking_lot::Mutex;
use shortly_core::{AccessCountSink, CounterStore};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::pass::{PassReport, Reconciler};
use crate::{Result, WorkerConfig, WorkerError};

struct Running {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

/// Periodically moves access counts from the counter store into the
/// durable sink.
///
/// The first pass runs as soon as the worker starts, then one pass per
/// [`WorkerConfig::interval`]. A stop request is honoured between passes; a
/// pass in progress is allowed to finish.
pub struct AccessSyncWorker {
    reconciler: Arc<Reconciler>,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for AccessSyncWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessSyncWorker")
            .field("config", self.reconciler.config())
            .field("running", &self.is_running())
            .finish()
    }
}

impl AccessSyncWorker {
    pub fn new(
        store: Arc<dyn CounterStore>,
        sink: Arc<dyn AccessCountSink>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            reconciler: Arc::new(Reconciler::new(store, sink, config)),
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Spawns the background loop. Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(WorkerError::AlreadyStarted);
        }

        let shutdown = Arc::new(Notify::new());
        let reconciler = Arc::clone(&self.reconciler);
        let signal = Arc::clone(&shutdown);
        let handle = tokio::spawn(async move {
            let config = reconciler.config();
            info!(
                interval_secs = config.interval.as_secs(),
                pass_timeout_secs = config.pass_timeout.as_secs(),
                concurrency = config.concurrency(),
                "access sync worker started"
            );

            // The first tick completes immediately.
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = signal.notified() => break,
                    _ = ticker.tick() => {
                        reconciler.run_pass().await;
                    }
                }
            }
            info!("access sync worker stopped");
        });

        *running = Some(Running { shutdown, handle });
        Ok(())
    }

    /// Signals the loop to stop and waits for it to exit.
    pub async fn stop(&self) -> Result<()> {
        let Some(running) = self.running.lock().take() else {
            return Err(WorkerError::NotRunning);
        };

        // `notify_one` stores a permit, so a stop that arrives mid-pass is
        // seen as soon as the pass returns.
        running.shutdown.notify_one();
        if let Err(e) = running.handle.await {
            error!(error = %e, "access sync worker task failed");
        }
        Ok(())
    }

    /// Runs a single pass now, independently of the background loop.
    pub async fn run_pass(&self) -> PassReport {
        self.reconciler.run_pass().await
    }
}
