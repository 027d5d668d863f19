//! Reconnect delay schedule.
//!
//! Consecutive connection failures stretch the delay geometrically up to
//! a cap; any successful connection resets the schedule, so the next
//! failure starts over from the initial delay.

use std::time::Duration;

/// Delay schedule for client reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Multiplier applied on each consecutive failure.
    pub multiplier: f64,
    /// Upper bound on the delay.
    pub max_delay: Duration,
    /// Replace each delay with a random duration up to its value,
    /// spreading reconnection storms across time.
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            multiplier: 1.5,
            max_delay: Duration::from_secs(10),
            jitter: false,
        }
    }
}

impl ReconnectPolicy {
    /// Returns the delay following `current`, where `None` means this is
    /// the first failure since the schedule was reset.
    pub fn next(&self, current: Option<Duration>) -> Duration {
        let base = match current {
            None => self.initial_delay,
            Some(delay) => delay.mul_f64(self.multiplier),
        };
        let capped = base.min(self.max_delay);
        if self.jitter {
            capped.mul_f64(rand::random::<f64>())
        } else {
            capped
        }
    }
}
