use std::{future::Future, time::Duration};
use tokio::time::sleep;

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
/// Hard ceiling on attempts, including the first one.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Fixed-delay, bounded retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_RETRY_ATTEMPTS),
            delay,
        }
    }
}

/// Runs `op` until it succeeds, fails with an error `is_retryable` rejects, or
/// `policy.max_attempts` is spent. Returns the last error in the latter cases.
pub async fn with_retry<T, E, F, Fut, P>(policy: RetryPolicy, is_retryable: P, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.clamp(1, MAX_RETRY_ATTEMPTS);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                tracing::warn!(
                    "Storage attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt,
                    max_attempts,
                    err,
                    policy.delay
                );
                attempt += 1;
                sleep(policy.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
