//! Percussive layer
//!
//! A whole-note loop on the transport. Once armed it always plays the base
//! kick pair; every escalation threshold reached by the current run length
//! layers one more embellishment on top of the lower ones.

use std::time::Duration;

use tracing::debug;

use super::graph::{Drum, DrumHit};

/// Timeline ticks after speech start before the loop is armed
pub const PERCUSSION_WARMUP_TICKS: u64 = 8;

/// Run lengths at which each embellishment joins the pattern
pub const ESCALATION_THRESHOLDS: [u32; 6] = [4, 6, 8, 10, 12, 15];

/// Measures in one pattern cycle
const MEASURES_PER_CYCLE: u32 = 4;

/// Beats in the loop period (one whole note)
const BEATS_PER_LOOP: f64 = 4.0;

const KICK_HZ: f32 = 32.70; // C1
const TOM_E2: f32 = 82.41;
const TOM_G2: f32 = 98.00;
const TOM_A2: f32 = 110.00;

/// Rhythmic additions, in escalation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Embellishment {
    ExtraKick,
    OffbeatTom,
    TomFill,
    DoubleTimeKicks,
    TomRoll,
    FullIntensity,
}

const ALL_EMBELLISHMENTS: [Embellishment; 6] = [
    Embellishment::ExtraKick,
    Embellishment::OffbeatTom,
    Embellishment::TomFill,
    Embellishment::DoubleTimeKicks,
    Embellishment::TomRoll,
    Embellishment::FullIntensity,
];

impl Embellishment {
    /// 1-based escalation level
    pub fn level(&self) -> usize {
        match self {
            Embellishment::ExtraKick => 1,
            Embellishment::OffbeatTom => 2,
            Embellishment::TomFill => 3,
            Embellishment::DoubleTimeKicks => 4,
            Embellishment::TomRoll => 5,
            Embellishment::FullIntensity => 6,
        }
    }

    /// Run length needed to enable this embellishment
    pub fn threshold(&self) -> u32 {
        ESCALATION_THRESHOLDS[self.level() - 1]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Embellishment::ExtraKick => "extra kick",
            Embellishment::OffbeatTom => "off-beat tom",
            Embellishment::TomFill => "tom fill",
            Embellishment::DoubleTimeKicks => "double-time kicks",
            Embellishment::TomRoll => "tom roll",
            Embellishment::FullIntensity => "full intensity",
        }
    }

    /// Hits this embellishment adds to `measure` (0..4)
    fn hits(&self, measure: u32) -> Vec<DrumHit> {
        match self {
            Embellishment::ExtraKick => vec![kick(0.5, 0.65)],
            Embellishment::OffbeatTom if measure % 2 == 1 => vec![tom(TOM_G2, 0.75, 0.45)],
            Embellishment::TomFill if measure == 3 => vec![
                tom(TOM_A2, 0.6, 0.5),
                tom(TOM_G2, 0.7, 0.55),
                tom(TOM_E2, 0.8, 0.6),
            ],
            Embellishment::DoubleTimeKicks => vec![kick(0.35, 0.5), kick(0.65, 0.55)],
            Embellishment::TomRoll if measure == 1 || measure == 3 => {
                vec![tom(TOM_A2, 0.4, 0.4), tom(TOM_G2, 0.5, 0.45)]
            }
            Embellishment::FullIntensity => {
                let mut hits = vec![kick(0.25, 0.6), kick(0.85, 0.65)];
                if measure % 2 == 0 {
                    hits.push(tom(TOM_E2, 0.3, 0.5));
                    hits.push(tom(TOM_G2, 0.55, 0.5));
                }
                hits
            }
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for Embellishment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn kick(delay: f32, velocity: f32) -> DrumHit {
    DrumHit {
        drum: Drum::Kick,
        frequency: KICK_HZ,
        velocity,
        delay,
    }
}

fn tom(frequency: f32, delay: f32, velocity: f32) -> DrumHit {
    DrumHit {
        drum: Drum::Tom,
        frequency,
        velocity,
        delay,
    }
}

/// Number of thresholds reached by `run_length` (0..=6)
pub fn escalation_level(run_length: u32) -> usize {
    ESCALATION_THRESHOLDS
        .iter()
        .take_while(|&&t| run_length >= t)
        .count()
}

/// Embellishments active at `run_length`, lowest level first
pub fn embellishments(run_length: u32) -> &'static [Embellishment] {
    &ALL_EMBELLISHMENTS[..escalation_level(run_length)]
}

/// Every hit of one measure, offsets relative to the measure start
pub fn measure_hits(measure: u32, run_length: u32) -> Vec<DrumHit> {
    let measure = measure % MEASURES_PER_CYCLE;
    let mut hits = vec![kick(0.0, 0.9), kick(0.15, 0.7)];
    for e in embellishments(run_length) {
        hits.extend(e.hits(measure));
    }
    hits
}

/// Hits at most this many seconds overdue still play, immediately
pub const LATE_GRACE: f32 = 0.1;

/// Whole-note loop aligned to the transport origin
#[derive(Debug, Clone)]
pub struct PercussionLoop {
    period: f64,
    origin: Option<f64>,
    armed: bool,
    next_measure: Option<f64>,
    beat_count: u32,
}

impl PercussionLoop {
    pub fn new(bpm: f32) -> Self {
        Self {
            period: BEATS_PER_LOOP * 60.0 / bpm.max(1.0) as f64,
            origin: None,
            armed: false,
            next_measure: None,
            beat_count: 0,
        }
    }

    /// Loop period in seconds
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Transport started at `now`; the loop stays silent until armed
    pub fn start_transport(&mut self, now: Duration) {
        self.origin = Some(now.as_secs_f64());
        self.armed = false;
        self.next_measure = None;
        self.beat_count = 0;
    }

    /// Request the loop to begin at the next measure boundary
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Transport stopped; nothing is pending afterwards
    pub fn stop(&mut self) {
        self.origin = None;
        self.armed = false;
        self.next_measure = None;
    }

    /// Whether the loop has been armed on a running transport
    pub fn is_active(&self) -> bool {
        self.armed && self.origin.is_some()
    }

    /// Measures played since arming
    pub fn beat_count(&self) -> u32 {
        self.beat_count
    }

    /// Hits due by `now`, with delays relative to `now`.
    ///
    /// Measures missed by more than one period are skipped rather than
    /// played late in a burst.
    pub fn due(&mut self, now: Duration, run_length: u32) -> Vec<DrumHit> {
        let origin = match self.origin {
            Some(o) if self.armed => o,
            _ => return Vec::new(),
        };
        let now = now.as_secs_f64();

        let next = *self.next_measure.get_or_insert_with(|| {
            let elapsed = (now - origin).max(0.0);
            origin + (elapsed / self.period).ceil() * self.period
        });
        if now < next {
            return Vec::new();
        }

        let missed = ((now - next) / self.period).floor() as u32;
        if missed > 0 {
            debug!(missed, "percussion skipped stale measures");
        }
        let measure_start = next + missed as f64 * self.period;
        let measure = self.beat_count.wrapping_add(missed) % MEASURES_PER_CYCLE;
        self.beat_count = self.beat_count.wrapping_add(missed + 1);
        self.next_measure = Some(measure_start + self.period);

        let late = (now - measure_start) as f32;
        measure_hits(measure, run_length)
            .into_iter()
            .filter(|h| h.delay + LATE_GRACE >= late)
            .map(|mut h| {
                h.delay = (h.delay - late).max(0.0);
                h
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_escalation_levels() {
        assert_eq!(escalation_level(0), 0);
        assert_eq!(escalation_level(3), 0);
        assert_eq!(escalation_level(5), 1);
        assert_eq!(escalation_level(13), 5);
        assert_eq!(escalation_level(16), 6);
        assert_eq!(escalation_level(u32::MAX), 6);
    }

    #[test]
    fn test_embellishments_accumulate() {
        assert_eq!(embellishments(5), &[Embellishment::ExtraKick]);
        assert!(!embellishments(13).contains(&Embellishment::FullIntensity));
        assert!(embellishments(13).contains(&Embellishment::TomRoll));
        assert_eq!(embellishments(16).len(), 6);

        let mut prev = 0;
        for run in 0..20 {
            let level = embellishments(run).len();
            assert!(level >= prev);
            prev = level;
        }
    }

    #[test]
    fn test_measure_hits_layer_on_base() {
        let base = measure_hits(0, 1);
        assert_eq!(base.len(), 2);
        assert!(base.iter().all(|h| h.drum == Drum::Kick));

        // tom fill only lands on measure 3
        let m3 = measure_hits(3, 8);
        let m2 = measure_hits(2, 8);
        assert_eq!(m3.len(), 2 + 1 + 1 + 3);
        assert_eq!(m2.len(), 2 + 1);

        // higher run lengths never remove hits from a measure
        for m in 0..4 {
            let mut prev = 0;
            for run in 0..20 {
                let n = measure_hits(m, run).len();
                assert!(n >= prev);
                prev = n;
            }
        }
    }

    #[test]
    fn test_loop_silent_until_armed() {
        let mut lp = PercussionLoop::new(40.0);
        lp.start_transport(secs(0.0));
        assert!(lp.due(secs(12.0), 1).is_empty());
        assert!(!lp.is_active());
    }

    #[test]
    fn test_loop_waits_for_measure_boundary() {
        let mut lp = PercussionLoop::new(40.0);
        assert!((lp.period() - 6.0).abs() < 1e-9);
        lp.start_transport(secs(0.0));
        lp.arm();

        // armed at 14.4 s, first measure at 18 s
        assert!(lp.due(secs(14.4), 1).is_empty());
        assert!(lp.due(secs(17.9), 1).is_empty());
        let hits = lp.due(secs(18.0), 1);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].delay, 0.0);
        assert!((hits[1].delay - 0.15).abs() < 1e-6);

        assert!(lp.due(secs(18.1), 1).is_empty());
        assert_eq!(lp.due(secs(24.0), 1).len(), 2);
        assert_eq!(lp.beat_count(), 2);
    }

    #[test]
    fn test_loop_stop_clears_pending() {
        let mut lp = PercussionLoop::new(40.0);
        lp.start_transport(secs(0.0));
        lp.arm();
        lp.stop();
        assert!(!lp.is_active());
        assert!(lp.due(secs(60.0), 16).is_empty());
    }

    #[test]
    fn test_late_poll_drops_passed_hits() {
        let mut lp = PercussionLoop::new(40.0);
        lp.start_transport(secs(0.0));
        lp.arm();
        assert!(lp.due(secs(5.0), 5).is_empty());
        let hits = lp.due(secs(6.4), 5);
        // kicks at 0.0 and 0.15 already passed, 0.5 remains
        assert_eq!(hits.len(), 1);
        assert!((hits[0].delay - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_slightly_late_downbeat_still_plays() {
        let mut lp = PercussionLoop::new(40.0);
        lp.start_transport(secs(0.0));
        lp.arm();
        assert!(lp.due(secs(5.99), 1).is_empty());
        let hits = lp.due(secs(6.016), 1);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].delay, 0.0);
        assert!((hits[1].delay - 0.134).abs() < 1e-4);
    }
}
