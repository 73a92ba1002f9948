//! Bounded exponential backoff
//!
//! Shared by the capture device loop and the oracle client. Attempts are
//! counted including the first call, so `max_attempts = 3` means at most
//! two backoff sleeps.

use std::time::Duration;

use rand::Rng;

use crate::{CancelToken, SculptResult};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor per attempt
    pub multiplier: f64,
    /// Add up to 25% random jitter
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn multiplier(mut self, mult: f64) -> Self {
        self.multiplier = mult.max(1.0);
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Zero delays, no jitter - for tests and simulations
    pub fn immediate(max_attempts: u32) -> Self {
        RetryConfig {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
        }
    }
}

/// Exponential backoff calculator
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: RetryConfig,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(config: RetryConfig) -> Self {
        ExponentialBackoff { config, attempt: 1 }
    }

    /// Attempt number about to run or just run (1-based)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    pub fn has_more(&self) -> bool {
        self.attempt < self.config.max_attempts
    }

    /// Delay before the next attempt, or None once attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.has_more() {
            return None;
        }
        let delay = self.calculate_delay();
        self.attempt += 1;
        Some(delay)
    }

    fn calculate_delay(&self) -> Duration {
        let base = self.config.initial_delay.as_secs_f64();
        let grown = base * self.config.multiplier.powi(self.attempt as i32 - 1);
        let capped = grown.min(self.config.max_delay.as_secs_f64());

        let secs = if self.config.jitter && capped > 0.0 {
            let factor: f64 = rand::thread_rng().gen_range(0.0..0.25);
            capped + capped * factor
        } else {
            capped
        };

        Duration::from_secs_f64(secs)
    }

    pub fn reset(&mut self) {
        self.attempt = 1;
    }
}

/// Sleep for `delay`, returning `Cancelled` if the token fires first
pub async fn backoff_sleep(delay: Duration, cancel: &CancelToken) -> SculptResult<()> {
    if delay.is_zero() {
        return if cancel.is_cancelled() {
            Err(crate::SculptError::Cancelled)
        } else {
            Ok(())
        };
    }
    cancel.run(tokio::time::sleep(delay)).await
}
