use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;
use typed_builder::TypedBuilder;

/// How the delay between attempts evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay before every retry.
    Fixed,
    /// The delay doubles after every failed attempt.
    Exponential,
}

/// A bounded retry strategy.
///
/// # Example
///
/// ```rust
/// use shortly_core::{Backoff, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_attempts(5)
///     .delay(Duration::from_millis(10))
///     .backoff(Backoff::Exponential)
///     .build();
/// assert_eq!(policy.delay_for(3), Duration::from_millis(20));
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    #[builder(default = 3)]
    pub max_attempts: u32,
    #[builder(default = Duration::from_millis(100))]
    pub delay: Duration,
    #[builder(default = Backoff::Fixed)]
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self::builder().max_attempts(1).delay(Duration::ZERO).build()
    }

    /// Delay to wait before attempt number `attempt` (1-based).
    ///
    /// The first attempt never waits.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let exponent = (attempt - 2).min(16);
                self.delay.saturating_mul(1 << exponent)
            }
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Runs `op` until it succeeds or the policy is exhausted.
///
/// Each failed attempt is logged at `warn`. The last error is returned.
/// Every error is retried, so `op` must be safe to repeat.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_if(policy, operation, |_| true, op).await
}

/// Like [`retry`], but only errors for which `retryable` holds are retried.
///
/// Use this for operations that are not idempotent, retrying only errors
/// that prove the previous attempt never took effect.
pub async fn retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    operation: &str,
    retryable: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        let delay = policy.delay_for(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && retryable(&e) => {
                warn!(operation, attempt, error = %e, "operation failed, retrying");
                attempt += 1;
            }
            Err(e) => {
                warn!(operation, attempt, error = %e, "operation failed");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(max_attempts)
            .delay(Duration::from_millis(1))
            .build()
    }

    #[test]
    fn fixed_delay_is_constant_after_first_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::ZERO);
        assert_eq!(policy.delay_for(2), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(100));
    }

    #[test]
    fn exponential_delay_doubles() {
        let policy = RetryPolicy::builder()
            .delay(Duration::from_millis(10))
            .backoff(Backoff::Exponential)
            .build();
        assert_eq!(policy.delay_for(2), Duration::from_millis(10));
        assert_eq!(policy.delay_for(3), Duration::from_millis(20));
        assert_eq!(policy.delay_for(4), Duration::from_millis(40));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(&fast(3), "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(format!("failure {n}"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry(&fast(3), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("always".to_string())
        })
        .await;

        assert_eq!(result, Err("always".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let _: Result<(), String> = retry(&fast(0), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("nope".to_string())
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_if(
            &fast(5),
            "test",
            |e: &String| e.starts_with("refused"),
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 1 {
                    Err("refused".to_string())
                } else {
                    Err("reply lost".to_string())
                }
            },
        )
        .await;

        assert_eq!(result, Err("reply lost".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
