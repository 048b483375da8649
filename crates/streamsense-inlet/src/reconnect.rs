//! Retry logic with exponential backoff

use crate::error::Result;
use std::time::Duration;
use tracing::{info, warn};

/// Backoff strategy for repeated open attempts
pub struct ReconnectionStrategy {
    /// Base backoff in milliseconds
    base_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    max_backoff_ms: u64,

    /// Current attempt number
    current_attempt: u32,

    /// Maximum retry attempts (0 = no retries)
    max_attempts: u32,
}

impl ReconnectionStrategy {
    /// Create a new strategy
    ///
    /// # Arguments
    /// * `base_backoff_ms` - Initial backoff duration in milliseconds
    /// * `max_attempts` - Retries allowed after the first failure
    pub fn new(base_backoff_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_backoff_ms,
            max_backoff_ms: 10_000,
            current_attempt: 0,
            max_attempts,
        }
    }

    /// Next backoff (`base * 2^(attempt - 1)`, capped), or `None` when exhausted
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        self.current_attempt += 1;

        let exp = 2u64.saturating_pow(self.current_attempt - 1);
        let backoff_ms = self
            .base_backoff_ms
            .saturating_mul(exp)
            .min(self.max_backoff_ms);

        Some(Duration::from_millis(backoff_ms))
    }

    /// Reset after a successful attempt
    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    pub fn attempt_number(&self) -> u32 {
        self.current_attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_attempt >= self.max_attempts
    }
}

/// Execute a retryable operation with exponential backoff
///
/// Errors for which [`InletError::is_retryable`](crate::InletError::is_retryable)
/// is false are returned immediately.
pub fn retry_with_backoff<F, T>(
    mut operation: F,
    strategy: &mut ReconnectionStrategy,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    loop {
        match operation() {
            Ok(result) => {
                if strategy.attempt_number() > 0 {
                    info!(
                        "[RECONNECT] {} succeeded after {} retries",
                        operation_name,
                        strategy.attempt_number()
                    );
                }
                strategy.reset();
                return Ok(result);
            }
            Err(e) if e.is_retryable() => match strategy.next_backoff() {
                Some(backoff) => {
                    warn!(
                        "[RECONNECT] {} failed (attempt {}): {} - retrying in {:?}",
                        operation_name,
                        strategy.attempt_number(),
                        e,
                        backoff
                    );
                    std::thread::sleep(backoff);
                }
                None => {
                    warn!(
                        "[RECONNECT] {} failed after {} retries - giving up",
                        operation_name,
                        strategy.attempt_number()
                    );
                    return Err(e);
                }
            },
            Err(e) => return Err(e),
        }
    }
}
