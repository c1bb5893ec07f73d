//! # Fibonacci Backoff
//!
//! Fibonacci-based delays between retries of workload list and patch calls.
//!
//! Sequence with a 200ms minimum and 2s maximum: 200ms, 200ms, 400ms, 600ms,
//! 1s, 1.6s, 2s (max).

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, starting from `min` twice
/// and capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Previous backoff value
    prev: Duration,
    /// Current backoff value
    current: Duration,
    /// Maximum backoff value
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with specified minimum and maximum values
    ///
    /// # Arguments
    ///
    /// * `min` - Minimum backoff duration (used for the first two values)
    /// * `max` - Maximum backoff duration (caps the sequence)
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            prev: Duration::ZERO,
            current: min.min(max),
            max,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;

        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = next.min(self.max);

        result
    }
}
