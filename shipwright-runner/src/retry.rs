//! Bounded retry with exponential backoff
//!
//! Only errors reporting `is_transient()` are retried. Duplicate versions,
//! credential failures and rejections surface on the first attempt.

use shipwright_core::PublishError;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Retry settings shared by every publish step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every further retry
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(2_000),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Final result of a retried operation and how many attempts it took
#[derive(Debug)]
pub struct Retried<T> {
    pub result: Result<T, PublishError>,
    pub attempts: u32,
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Retries without waiting between attempts
    #[cfg(test)]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails permanently or retries run out
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Retried<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PublishError>>,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match operation().await {
                Ok(value) => {
                    if attempts > 1 {
                        info!("{} succeeded after {} attempt(s)", label, attempts);
                    }
                    return Retried {
                        result: Ok(value),
                        attempts,
                    };
                }
                Err(e) if e.is_transient() && attempts <= self.max_retries => {
                    let delay = self.delay_for(attempts);
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        label,
                        attempts,
                        self.max_retries + 1,
                        e
                    );
                    warn!("Retrying in {} ms...", delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Retried {
                        result: Err(e),
                        attempts,
                    };
                }
            }
        }
    }
}
