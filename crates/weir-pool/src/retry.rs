//! Exponential backoff for retried operations
//!
//! Delays grow as `initial * multiplier^attempt`, capped at a maximum, with
//! optional jitter to keep many retrying clients from synchronizing.

use std::time::Duration;

/// Exponential backoff delay calculator.
///
/// Stateless: callers pass the zero-based attempt number and get the delay
/// to sleep before that retry.
#[derive(Debug, Clone)]
pub struct BackoffStrategy {
    /// Delay in milliseconds before the first retry
    initial_ms: u64,
    /// Cap for exponential growth, in milliseconds
    max_ms: u64,
    /// Growth factor per attempt
    multiplier: f64,
    /// Add up to ±25% randomness to each delay
    jitter: bool,
}

impl BackoffStrategy {
    /// Create a strategy with the given initial and maximum delays (ms).
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            initial_ms: initial_ms.max(1),
            max_ms: max_ms.max(initial_ms),
            multiplier: 2.0,
            jitter: false,
        }
    }

    /// Set the growth factor (default 2.0; values below 1.0 are clamped).
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Enable jitter (±25% of the capped delay).
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to sleep before retry `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let raw_ms = (self.initial_ms as f64) * self.multiplier.powi(attempt as i32);
        let capped_ms = raw_ms.min(self.max_ms as f64) as u64;

        let final_ms = if self.jitter {
            let range = capped_ms / 4;
            let offset = (pseudo_random() * (range * 2) as f64) as u64;
            capped_ms.saturating_sub(range).saturating_add(offset)
        } else {
            capped_ms
        };

        Duration::from_millis(final_ms)
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    /// Maximum delay.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

impl Default for BackoffStrategy {
    /// 100ms initial, 30 second cap, doubling per attempt
    fn default() -> Self {
        Self::new(100, 30_000)
    }
}

/// Clock-derived value in [0.0, 1.0); enough entropy for retry jitter.
fn pseudo_random() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

#[cfg(test)]
mod tests;
