//! Exponential backoff with jitter for retry scheduling.

use std::time::Duration;

use rand::Rng;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Bounded retry schedule: yields a delay per remaining attempt, then `None`.
#[derive(Debug)]
pub struct RetrySchedule {
    attempt: u32,
    remaining: u32,
    base_ms: u64,
    max_ms: u64,
}

impl RetrySchedule {
    pub fn new(max_retries: u32, base_ms: u64, max_ms: u64) -> Self {
        Self {
            attempt: 0,
            remaining: max_retries,
            base_ms,
            max_ms,
        }
    }

    /// Delay before the next retry, or `None` when the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.attempt += 1;
        Some(calculate_backoff(self.attempt, self.base_ms, self.max_ms))
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempt
    }
}
