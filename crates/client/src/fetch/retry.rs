//! Fixed-delay retry loop.

use std::future::Future;
use std::time::Duration;

/// How many times to attempt a request and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (default: 3)
    pub tries: u32,
    /// Pause between attempts (default: 1s)
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { tries: 3, delay: Duration::from_secs(1) }
    }
}

/// Waits out the delay between attempts.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Run `op` until it succeeds or `policy.tries` attempts have failed.
///
/// The error of the final attempt is returned as-is. `sleeper` is invoked
/// between attempts only, so a run where every attempt fails sleeps
/// `tries - 1` times. A policy of zero tries still makes one attempt.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, sleeper: &dyn Sleeper, what: &str, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let tries = policy.tries.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= tries => return Err(e),
            Err(e) => {
                tracing::warn!(attempt, tries, "{} failed: {}; retrying in {:?}", what, e, policy.delay);
                sleeper.sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
