use std::time::Duration;
use typed_builder::TypedBuilder;

/// Settings for [`AccessSyncWorker`](crate::AccessSyncWorker).
///
/// # Example
///
/// ```rust
/// use shortly_worker::WorkerConfig;
/// use std::time::Duration;
///
/// let config = WorkerConfig::builder()
///     .interval(Duration::from_secs(600))
///     .concurrency(0)
///     .build();
/// assert_eq!(config.concurrency(), 1);
/// assert_eq!(config.pass_timeout, Duration::from_secs(300));
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct WorkerConfig {
    /// Time between the starts of two passes.
    #[builder(default = Duration::from_secs(60 * 60))]
    pub interval: Duration,
    /// Upper bound on a single pass.
    #[builder(default = Duration::from_secs(5 * 60))]
    pub pass_timeout: Duration,
    #[builder(default = 10)]
    concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl WorkerConfig {
    /// Maximum number of keys reconciled at once. Never zero.
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
