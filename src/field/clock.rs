//! Frame clock
//!
//! Converts measured frame deltas into the animation's time units, so
//! motion speed does not depend on how often frames arrive.

use std::time::Duration;

/// Upper bound on a single frame delta; longer stalls are clamped
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    frame_rate: f32,
    slice_rate: f32,
    time: f32,
    slice_phase: f32,
    last: Option<Duration>,
}

impl FrameClock {
    /// `frame_rate` and `slice_rate` are units per second of wall time
    pub fn new(frame_rate: f32, slice_rate: f32) -> Self {
        Self {
            frame_rate,
            slice_rate,
            time: 0.0,
            slice_phase: 0.0,
            last: None,
        }
    }

    /// Advance by the time since the previous call. The first call only
    /// records `now`.
    pub fn advance_to(&mut self, now: Duration) -> Duration {
        let delta = match self.last {
            Some(last) => now.saturating_sub(last).min(MAX_FRAME_DELTA),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        self.advance_by(delta);
        delta
    }

    /// Advance by an explicit delta
    pub fn advance_by(&mut self, delta: Duration) {
        let dt = delta.as_secs_f32();
        self.time += dt * self.frame_rate;
        self.slice_phase += dt * self.slice_rate;
    }

    /// Animation time fed to the distortion functions
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Phase driving the slice rotation
    pub fn slice_phase(&self) -> f32 {
        self.slice_phase
    }

    /// Forget the last timestamp so the next frame does not see the gap
    pub fn pause(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_independent() {
        let mut fast = FrameClock::new(50.0, 60.0);
        let mut slow = FrameClock::new(50.0, 60.0);

        // one second at 120 fps vs 30 fps
        for i in 0..=120u64 {
            fast.advance_to(Duration::from_micros(i * 1_000_000 / 120));
        }
        for i in 0..=30u64 {
            slow.advance_to(Duration::from_micros(i * 1_000_000 / 30));
        }
        assert!((fast.time() - 50.0).abs() < 1e-2);
        assert!((slow.time() - 50.0).abs() < 1e-2);
        assert!((fast.slice_phase() - slow.slice_phase()).abs() < 1e-2);
    }

    #[test]
    fn test_first_frame_is_zero() {
        let mut clock = FrameClock::new(50.0, 60.0);
        assert_eq!(clock.advance_to(Duration::from_secs(100)), Duration::ZERO);
        assert_eq!(clock.time(), 0.0);
    }

    #[test]
    fn test_stall_is_clamped() {
        let mut clock = FrameClock::new(50.0, 60.0);
        clock.advance_to(Duration::ZERO);
        let delta = clock.advance_to(Duration::from_secs(5));
        assert_eq!(delta, MAX_FRAME_DELTA);
        assert!((clock.time() - 12.5).abs() < 1e-4);
    }

    #[test]
    fn test_pause_skips_gap() {
        let mut clock = FrameClock::new(50.0, 60.0);
        clock.advance_to(Duration::ZERO);
        clock.advance_to(Duration::from_millis(100));
        clock.pause();
        clock.advance_to(Duration::from_secs(10));
        assert!((clock.time() - 5.0).abs() < 1e-4);
    }
}
