use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::ProviderError;

/// Bounded exponential backoff for flaky upstream providers.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound on the time spent across all attempts and sleeps.
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            deadline: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Fires once the owning [`CancelHandle`] calls `cancel`.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_, token) = cancel_pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // handle dropped without cancelling
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, runs out of
/// attempts, overruns the policy deadline, or the token is cancelled.
pub async fn with_backoff<T, F, Fut>(
    provider: &'static str,
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let deadline = Instant::now() + policy.deadline;
    let deadline_exceeded = || ProviderError::DeadlineExceeded {
        provider,
        deadline: policy.deadline,
    };
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled { provider }),
            _ = tokio::time::sleep_until(deadline) => return Err(deadline_exceeded()),
            result = op() => result,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => err,
            Err(err) => return Err(err),
        };

        if attempt >= max_attempts {
            return Err(ProviderError::RetriesExhausted {
                provider,
                attempts: attempt,
                last: err.to_string(),
            });
        }

        let delay = policy.backoff(attempt);
        if Instant::now() + delay > deadline {
            return Err(deadline_exceeded());
        }

        tracing::warn!(
            "{} attempt {}/{} failed ({}), retrying in {:?}",
            provider,
            attempt,
            max_attempts,
            err,
            delay
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled { provider }),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
