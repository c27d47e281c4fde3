use std::time::Duration;

use tokio::time::Instant;

/// Fixed-period deadline tracker.
///
/// The deadline advances by exactly one period per tick, independent of how
/// long the tick took. When a tick overruns its deadline the reference
/// snaps to "now": lost time is dropped, never caught up with a burst.
#[derive(Debug, Clone)]
pub struct Pacer {
    period: Duration,
    next_tick: Instant,
}

impl Pacer {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self { period, next_tick: now }
    }

    /// Restart pacing from `now`.
    pub fn reset(&mut self, now: Instant) {
        self.next_tick = now;
    }

    pub fn deadline(&self) -> Instant {
        self.next_tick
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Move the deadline one period forward.
    ///
    /// Returns the time left until the new deadline, or `None` when it has
    /// already passed (the reference is then reset to `now`).
    pub fn advance(&mut self, now: Instant) -> Option<Duration> {
        self.next_tick += self.period;
        if self.next_tick > now {
            Some(self.next_tick - now)
        } else {
            self.next_tick = now;
            None
        }
    }
}
