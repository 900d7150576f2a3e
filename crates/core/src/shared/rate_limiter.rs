use std::time::{Duration, Instant};

/// Fixed-interval gate shared by the UI debounce, log throttle and capture
/// cooldown.
///
/// Not synchronized: each instance must be driven from a single thread.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    pub fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }

    /// Fires when no previous fire exists or `interval` has elapsed since it.
    /// A fire records `now`; a refusal leaves the state untouched.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        let ready = match self.last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if ready {
            self.last_fired = Some(now);
        }
        ready
    }
}
