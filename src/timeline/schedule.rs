//! Fixed-period tick schedule
//!
//! A single deadline slot over a caller-supplied monotonic clock. Arming
//! replaces whatever was pending, so there is never more than one live
//! timer, and a generation counter tells stale deadlines apart. A zero
//! period never fires.

use std::time::Duration;

use tracing::debug;

/// Most ticks a single poll will deliver after a stall
pub const MAX_CATCH_UP: u32 = 4;

#[derive(Debug, Clone)]
pub struct TickSchedule {
    period: Duration,
    next: Option<Duration>,
    generation: u64,
}

impl TickSchedule {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: None,
            generation: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Arm the first deadline one period after `now`, dropping any pending one
    pub fn arm(&mut self, now: Duration) -> u64 {
        self.generation += 1;
        self.next = Some(now + self.period);
        self.generation
    }

    /// Disarm; later polls report nothing until re-armed
    pub fn cancel(&mut self) {
        if self.next.take().is_some() {
            self.generation += 1;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    /// Incremented on every arm and effective cancel
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Pending deadline
    pub fn deadline(&self) -> Option<Duration> {
        self.next
    }

    /// Number of ticks due at `now`. Deadlines beyond [`MAX_CATCH_UP`] are
    /// skipped so a stalled host does not fire a burst.
    pub fn poll(&mut self, now: Duration) -> u32 {
        let Some(mut next) = self.next else {
            return 0;
        };
        if self.period.is_zero() {
            return 0;
        }

        let mut due = 0u32;
        let mut skipped = 0u64;
        while now >= next {
            if due < MAX_CATCH_UP {
                due += 1;
            } else {
                skipped += 1;
            }
            next += self.period;
        }
        if skipped > 0 {
            debug!(skipped, "tick schedule dropped overdue deadlines");
        }

        self.next = Some(next);
        due
    }
}
