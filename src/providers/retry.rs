// Caller-level retry with exponential backoff
//
// The pipeline itself never retries. Front ends that want retries wrap a
// run in `with_retry`; only retryable failures are attempted again.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::errors::Result;

const BASE_DELAY_MS: u64 = 1000;
const MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Backoff before retry `attempt + 1`, doubling up to `MAX_DELAY`
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(2u32.saturating_pow(attempt))
            .map_or(MAX_DELAY, |delay| delay.min(MAX_DELAY))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Execute `f`, retrying transport/service failures per `policy`
pub async fn with_retry<F, Fut, T>(policy: RetryPolicy, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < policy.retries => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                    attempt + 1,
                    policy.retries + 1,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
