//! Retry schedules with exponential backoff

use std::time::Duration;

/// How many times to retry and how long to wait in between
///
/// The delay before retry `n + 1` (counting from zero) is
/// `initial_backoff * backoff_factor^n`. There is no jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(300),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            initial_backoff,
            backoff_factor,
        }
    }

    /// A single attempt with no retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    /// Total number of attempts this policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay between attempt `n` and attempt `n + 1`, counting from zero
    pub fn delay_for(&self, n: u32) -> Duration {
        let exponent = i32::try_from(n).unwrap_or(i32::MAX);
        let nanos = self.initial_backoff.as_nanos() as f64 * self.backoff_factor.powi(exponent);
        if nanos.is_nan() || nanos < 0.0 {
            // Nonsensical factors fall back to a constant delay
            return self.initial_backoff;
        }
        // Float-to-int casts saturate, so huge delays clamp instead of wrapping
        Duration::from_nanos(nanos.round() as u64)
    }

    /// Every delay this policy would sleep for, in order
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(move |n| self.delay_for(n))
    }
}

/// Retry schedules for the two cycles of a validated fetch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationPolicy {
    /// Used for the first fetch
    pub first: RetryPolicy,
    /// Used once more when the first result fails validation
    pub second: RetryPolicy,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            first: RetryPolicy::new(1, Duration::from_millis(300), 2.0),
            second: RetryPolicy::new(1, Duration::from_millis(1000), 2.0),
        }
    }
}
