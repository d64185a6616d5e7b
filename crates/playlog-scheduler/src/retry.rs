use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// How many extra attempts a failed run gets, and how long to wait between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            retry_delay: Duration::from_secs(60),
        }
    }
}

/// Run `op` until it succeeds or `1 + policy.retries` attempts have failed.
///
/// `op` receives the 1-based attempt number. Returns the last result together
/// with the number of attempts made.
pub async fn run_with_retries<F, Fut, T, E>(policy: &RetryPolicy, mut op: F) -> (Result<T, E>, u32)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return (Ok(value), attempt),
            Err(e) if attempt <= policy.retries => {
                warn!(attempt, retries = policy.retries, error = %e, "attempt failed, retrying");
                tokio::time::sleep(policy.retry_delay).await;
                attempt += 1;
            }
            Err(e) => return (Err(e), attempt),
        }
    }
}
