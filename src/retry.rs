//! Exponential backoff bookkeeping for the transport
//!
//! A [`Backoff`] is created per logical request and dropped with it, so two
//! requests issued through the same client never share a counter or a delay.

use std::time::Duration;

use rand::Rng;

/// Shortest sleep the transport will ever perform
pub const MIN_BACKOFF: Duration = Duration::from_millis(100);

/// Symmetric jitter applied around the nominal delay (±25%)
const JITTER_FACTOR: f64 = 0.25;

/// Retry policy shared by every request of a client
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Extra attempts after the first; `0` means a single attempt
    pub max_retry: u32,
    /// Nominal delay before the first retry
    pub initial_delay: Duration,
}

impl RetryConfig {
    pub fn new(max_retry: u32, initial_delay: Duration) -> Self {
        Self {
            max_retry,
            initial_delay,
        }
    }

    /// Disable retries entirely
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(200))
    }
}

/// Retry counter and current delay for one logical request
#[derive(Debug)]
pub(crate) struct Backoff {
    attempt: u32,
    max_retry: u32,
    delay: Duration,
}

impl Backoff {
    pub(crate) fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_retry: config.max_retry,
            delay: config.initial_delay,
        }
    }

    /// Consume one retry and return its nominal delay, or `None` once the
    /// budget is spent. The delay doubles after every call.
    pub(crate) fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retry {
            return None;
        }

        let nominal = self.delay;
        self.attempt += 1;
        self.delay = self.delay.saturating_mul(2);
        Some(nominal)
    }

    /// Retries consumed so far
    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    pub(crate) fn max_retry(&self) -> u32 {
        self.max_retry
    }
}

/// Apply ±25% jitter to `nominal`, never going below [`MIN_BACKOFF`]
///
/// Saturates at `Duration::MAX` instead of overflowing.
pub(crate) fn jittered(nominal: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range((1.0 - JITTER_FACTOR)..=(1.0 + JITTER_FACTOR));
    Duration::try_from_secs_f64(nominal.as_secs_f64() * factor)
        .unwrap_or(Duration::MAX)
        .max(MIN_BACKOFF)
}
