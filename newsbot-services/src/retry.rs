//! Exponential-backoff retry for outbound calls
//!
//! Only errors classified as [`Transient`] are retried. The delay doubles from
//! `initial_delay` up to `max_delay`, and after `max_attempts` total attempts
//! the last error is returned unmodified.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use newsbot_core::Transient;
use tracing::{debug, warn};

/// Retry configuration shared by feed, extraction and LLM calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self.initial_delay.saturating_mul(1u32 << exponent);
        delay.clamp(self.initial_delay, self.max_delay.max(self.initial_delay))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("[RETRY:{}] attempt {}/{}", label, attempt, max_attempts);

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                debug!("[RETRY:{}] permanent error, not retrying: {}", label, err);
                return Err(err);
            }

            if attempt >= max_attempts {
                warn!(
                    "[RETRY:{}] giving up after {} attempts: {}",
                    label, attempt, err
                );
                return Err(err);
            }

            let delay = self.delay_for(attempt);
            warn!(
                "[RETRY:{}] attempt {} failed, retrying in {:?}: {}",
                label, attempt, delay, err
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
