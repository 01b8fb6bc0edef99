//! Retry with exponential backoff
//!
//! Attempt 1 runs immediately; the delay before attempt `n` (n >= 2) is
//! `min(max_delay, base_delay * 2^(n-2))`, so the defaults wait 2s then 4s.
//! Each attempt may be bounded by its own timeout. Errors that report
//! themselves as non-retryable end the loop at once.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

/// Errors that know whether another attempt could help
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;

    /// The error to report when an attempt exceeds its deadline
    fn timed_out(after: Duration) -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub attempt_timeout: Option<Duration>,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_secs(config.base_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
            attempt_timeout: (config.attempt_timeout_secs > 0)
                .then(|| Duration::from_secs(config.attempt_timeout_secs)),
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before `attempt` (1-based). Zero for the first one.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts
    /// run out. The last error is returned.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: IsRetryable + std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            let result = match self.attempt_timeout {
                Some(limit) => match tokio::time::timeout(limit, operation(attempt)).await {
                    Ok(result) => result,
                    Err(_) => Err(E::timed_out(limit)),
                },
                None => operation(attempt).await,
            };

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempts = attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    attempt += 1;
                    let delay = self.delay_before(attempt);
                    let delay = if self.jitter { add_jitter(delay) } else { delay };

                    tracing::warn!(
                        error = %e,
                        attempt = attempt - 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::warn!(error = %e, attempts = attempt, "Giving up after all attempts");
                    } else {
                        tracing::debug!(error = %e, attempts = attempt, "Terminal error, not retrying");
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Spread the delay by up to 25% either way.
fn add_jitter(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.75..=1.25);
    Duration::from_secs_f64(delay.as_secs_f64() * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_secs(2));
        assert_eq!(policy.delay_before(3), Duration::from_secs(4));
        assert_eq!(policy.delay_before(4), Duration::from_secs(8));
        assert_eq!(policy.delay_before(5), Duration::from_secs(10));
        assert_eq!(policy.delay_before(40), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = RetryConfig {
            attempt_timeout_secs: 0,
            ..RetryConfig::default()
        };
        assert_eq!(RetryPolicy::from(&config).attempt_timeout, None);
        assert_eq!(
            RetryPolicy::default().attempt_timeout,
            Some(Duration::from_secs(120))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), SourceError> = RetryPolicy::default()
            .run(|_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SourceError::NotFound("no subtitles".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(SourceError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_exhausts_attempts_with_backoff() {
        let start = Instant::now();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let log = seen.clone();
        let result: Result<(), SourceError> = RetryPolicy::default()
            .run(|attempt| {
                let log = log.clone();
                async move {
                    log.lock().push((attempt, start.elapsed()));
                    Err(SourceError::Transport("connection reset".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(SourceError::Transport(_))));
        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0, 1);
        assert!(seen[1].1 >= Duration::from_secs(2));
        assert!(seen[2].1 >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_later_attempt() {
        let result: Result<&str, SourceError> = RetryPolicy::default()
            .run(|attempt| async move {
                if attempt < 3 {
                    Err(SourceError::Unavailable("try later".into()))
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_retried() {
        let policy = RetryPolicy {
            attempt_timeout: Some(Duration::from_secs(5)),
            ..RetryPolicy::default()
        };
        let result: Result<(), SourceError> = policy
            .run(|_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(SourceError::Timeout(Duration::from_secs(5))));
    }
}
