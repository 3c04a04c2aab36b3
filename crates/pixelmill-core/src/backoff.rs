//! Exponential backoff with jitter for the waiter's polling loop.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff policy with equal jitter.
///
/// The nominal delay for attempt `n` (1-indexed) is
/// `base * multiplier^(n-1)`, capped at `max`; the actual delay is drawn
/// uniformly from `[nominal / 2, nominal]` so that concurrent waiters
/// sharing one outbox queue do not poll in lockstep.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Multiplier applied per attempt.
    pub multiplier: f64,
    /// Upper bound on the nominal delay.
    pub max: Duration,
}

impl BackoffPolicy {
    /// Create a policy from its three parameters.
    pub fn new(base: Duration, multiplier: f64, max: Duration) -> Self {
        Self {
            base,
            multiplier,
            max,
        }
    }

    /// Nominal (un-jittered) delay for the given 1-indexed attempt.
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.base.as_secs_f64() * self.multiplier.powi(exp);
        Duration::from_secs_f64(secs.min(self.max.as_secs_f64()))
    }

    /// Jittered delay for the given 1-indexed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_delay(attempt).as_millis() as u64;
        if nominal == 0 {
            return Duration::ZERO;
        }
        let jittered = rand::rng().random_range(nominal / 2..=nominal);
        Duration::from_millis(jittered)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            multiplier: 2.0,
            max: Duration::from_secs(10),
        }
    }
}
