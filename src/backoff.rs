//! Bounded exponential backoff for reconnects and failed polls.

use std::time::Duration;

/// Delay before the first retry of an episode.
pub const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Exponential backoff with a ceiling and no retry limit.
///
/// The delay for attempt `n` is `min(2^n × 1000 ms, ceiling)`. The attempt
/// counter only goes back to zero through [`reset`](Backoff::reset), which
/// callers invoke after a confirmed success.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    ceiling: Duration,
}

impl Backoff {
    pub fn new(ceiling: Duration) -> Self {
        Self {
            attempt: 0,
            ceiling,
        }
    }

    /// Number of retries scheduled since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay for the current attempt; advances the counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = delay_for(self.attempt, self.ceiling);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// `min(2^attempt × 1000 ms, ceiling)`, saturating instead of overflowing.
pub fn delay_for(attempt: u32, ceiling: Duration) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    BASE_DELAY.saturating_mul(factor).min(ceiling)
}
