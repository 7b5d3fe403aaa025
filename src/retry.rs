use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// Fixed-attempt, fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            delay,
        }
    }

    /// The operation always runs at least once.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Returned when every attempt failed; carries the last failure.
#[derive(Error, Debug)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Runs `operation` until it succeeds or the policy's attempts are used up.
///
/// The operation receives the 1-based attempt number. Each failure except the
/// last is logged before sleeping for `policy.delay`.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: F,
) -> std::result::Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    retry_with_observer(policy, operation, |_, _| {}).await
}

/// Same as [`retry`], but `on_failure` sees every failed attempt (the final
/// one included) before the next attempt starts or the failure is returned.
pub async fn retry_with_observer<T, E, F, Fut, O>(
    policy: &RetryPolicy,
    mut operation: F,
    mut on_failure: O,
) -> std::result::Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
    O: FnMut(u32, &E),
{
    let max_attempts = policy.effective_attempts();
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                on_failure(attempt, &e);
                if attempt >= max_attempts {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                warn!(
                    attempt,
                    max_attempts,
                    error = %e,
                    "Attempt failed. Retrying in {:?}...",
                    policy.delay
                );
                sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
