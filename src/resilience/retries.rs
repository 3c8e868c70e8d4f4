//! Bounded retries for soft upstream failures.
//!
//! # Responsibilities
//! - Run an async operation until it succeeds or the attempts run out
//! - Space attempts with `calculate_backoff`
//! - Log every failed attempt with the remaining budget

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::resilience::backoff::calculate_backoff;

/// How often and how far apart an operation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Constant spacing between attempts.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        let delay_ms = delay.as_millis() as u64;
        Self {
            max_retries,
            base_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
        }
    }

    /// A single attempt.
    pub fn once() -> Self {
        Self::fixed(0, Duration::ZERO)
    }
}

/// Execute `operation` with up to `policy.max_retries` retries.
///
/// Returns the first success, or the error of the last attempt.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation_name: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0;
    loop {
        let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
        if !delay.is_zero() {
            tracing::debug!(operation = operation_name, attempt, delay = ?delay, "Retrying");
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < policy.max_retries => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    remaining = policy.max_retries - attempt,
                    error = %e,
                    "Attempt failed"
                );
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(operation = operation_name, attempts = attempt + 1, error = %e, "All attempts failed");
                return Err(e);
            }
        }
    }
}
