//! Emotion timeline driver
//!
//! Walks a speech segment by segment at a fixed cadence, looping forever.
//! The driver is the only writer of [`TimelineState`]; listeners receive a
//! read-only view synchronously on every tick, so the field and the audio
//! layer always react to the same segment.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::schedule::TickSchedule;
use crate::core::error::{EngineError, Result};
use crate::emotion::{EmotionLabel, Speech, SpeechSegment};

/// Snapshot of the timeline position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineState {
    /// Index of the selected speech in the host's collection
    pub speech_index: usize,
    pub segment_index: usize,
    /// Dominant emotion of the current segment
    pub dominant: EmotionLabel,
    /// Consecutive ticks sharing `dominant`
    pub run_length: u32,
    pub last_dominant: Option<EmotionLabel>,
    /// Ticks since the last start or restart
    pub ticks: u64,
}

/// Receives every timeline advance
pub trait TimelineListener {
    fn on_tick(&mut self, state: &TimelineState, segment: &SpeechSegment);
}

/// Drives a speech's segments on a [`TickSchedule`]
#[derive(Debug)]
pub struct TimelineDriver {
    schedule: TickSchedule,
    speech: Option<Arc<Speech>>,
    state: Option<TimelineState>,
}

impl TimelineDriver {
    pub fn new(period: Duration) -> Self {
        Self {
            schedule: TickSchedule::new(period),
            speech: None,
            state: None,
        }
    }

    /// Begin playback at segment 0 with a run length of 1.
    ///
    /// Fails without touching the current state when the speech has no
    /// segments. Any pending tick from an earlier start is replaced.
    pub fn start(&mut self, speech: Arc<Speech>, speech_index: usize, now: Duration) -> Result<TimelineState> {
        self.begin(speech, speech_index, now, true)
    }

    /// Switch to another speech at segment 0 with the run counter cleared
    pub fn select(&mut self, speech: Arc<Speech>, speech_index: usize, now: Duration) -> Result<TimelineState> {
        self.begin(speech, speech_index, now, false)
    }

    /// Restart the current speech from segment 0 with the run counter
    /// cleared, so the next tick counts as the first of a new run.
    pub fn restart(&mut self, now: Duration) -> Result<TimelineState> {
        let (speech, index) = match (&self.speech, &self.state) {
            (Some(speech), Some(state)) => (Arc::clone(speech), state.speech_index),
            _ => {
                return Err(EngineError::Timeline {
                    message: "restart requested while stopped".to_string(),
                    speech: None,
                })
            }
        };
        self.begin(speech, index, now, false)
    }

    fn begin(&mut self, speech: Arc<Speech>, speech_index: usize, now: Duration, counted: bool) -> Result<TimelineState> {
        speech.validate()?;
        let dominant = speech.segments[0].dominant();

        let state = TimelineState {
            speech_index,
            segment_index: 0,
            dominant,
            run_length: if counted { 1 } else { 0 },
            last_dominant: if counted { Some(dominant) } else { None },
            ticks: 0,
        };

        let generation = self.schedule.arm(now);
        info!(
            speaker = %speech.speaker,
            segments = speech.len(),
            %dominant,
            generation,
            "timeline started"
        );

        self.speech = Some(speech);
        self.state = Some(state);
        Ok(state)
    }

    /// Advance one segment without notifying anyone
    pub fn tick(&mut self) -> Option<TimelineState> {
        self.tick_with(&mut [])
    }

    /// Advance one segment and notify `listeners` before returning.
    /// Returns `None` while stopped.
    pub fn tick_with(&mut self, listeners: &mut [&mut dyn TimelineListener]) -> Option<TimelineState> {
        let speech = self.speech.as_ref()?;
        let state = self.state.as_mut()?;

        let next = (state.segment_index + 1) % speech.len();
        let segment = &speech.segments[next];
        let dominant = segment.dominant();

        if state.last_dominant == Some(dominant) {
            state.run_length = state.run_length.saturating_add(1);
        } else {
            state.run_length = 1;
            state.last_dominant = Some(dominant);
        }
        state.segment_index = next;
        state.dominant = dominant;
        state.ticks += 1;

        debug!(
            segment = next,
            %dominant,
            run = state.run_length,
            "timeline tick"
        );

        let snapshot = *state;
        for listener in listeners.iter_mut() {
            listener.on_tick(&snapshot, segment);
        }
        Some(snapshot)
    }

    /// Fire every tick due at `now`; returns how many fired
    pub fn poll(&mut self, now: Duration, listeners: &mut [&mut dyn TimelineListener]) -> u32 {
        if self.state.is_none() {
            return 0;
        }
        let due = self.schedule.poll(now);
        for _ in 0..due {
            self.tick_with(listeners);
        }
        due
    }

    /// Cancel the pending tick and drop the state
    pub fn stop(&mut self) {
        self.schedule.cancel();
        if self.state.take().is_some() {
            info!("timeline stopped");
        }
        self.speech = None;
    }

    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&TimelineState> {
        self.state.as_ref()
    }

    /// Segment under the playhead
    pub fn current_segment(&self) -> Option<&SpeechSegment> {
        let state = self.state.as_ref()?;
        self.speech.as_ref()?.segment(state.segment_index)
    }

    pub fn speech(&self) -> Option<&Arc<Speech>> {
        self.speech.as_ref()
    }

    pub fn schedule(&self) -> &TickSchedule {
        &self.schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::{EmotionScore, SpeechSegment};

    fn speech_of(labels: &[EmotionLabel]) -> Arc<Speech> {
        let segments = labels
            .iter()
            .enumerate()
            .map(|(i, &l)| SpeechSegment::single(format!("line {}", i), l))
            .collect();
        Arc::new(Speech::new("test", segments))
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[derive(Default)]
    struct Recorder {
        seen: Vec<(usize, EmotionLabel, u32)>,
    }

    impl TimelineListener for Recorder {
        fn on_tick(&mut self, state: &TimelineState, segment: &SpeechSegment) {
            assert_eq!(segment.dominant(), state.dominant);
            self.seen.push((state.segment_index, state.dominant, state.run_length));
        }
    }

    #[test]
    fn test_start_state() {
        let mut driver = TimelineDriver::new(ms(1800));
        let state = driver
            .start(speech_of(&[EmotionLabel::Fear, EmotionLabel::Joy]), 3, ms(0))
            .unwrap();
        assert_eq!(state.segment_index, 0);
        assert_eq!(state.run_length, 1);
        assert_eq!(state.dominant, EmotionLabel::Fear);
        assert_eq!(state.speech_index, 3);
        assert_eq!(driver.current_segment().unwrap().text, "line 0");
    }

    #[test]
    fn test_empty_speech_refuses_start() {
        let mut driver = TimelineDriver::new(ms(1800));
        let err = driver.start(Arc::new(Speech::new("x", Vec::new())), 0, ms(0));
        assert!(matches!(err, Err(EngineError::Timeline { .. })));
        assert!(!driver.is_running());
        assert!(driver.tick().is_none());
        assert!(!driver.schedule().is_armed());
    }

    #[test]
    fn test_wraparound_after_segment_count_ticks() {
        for n in 1..6 {
            let labels: Vec<_> = EmotionLabel::all().iter().copied().cycle().take(n).collect();
            let mut driver = TimelineDriver::new(ms(1800));
            driver.start(speech_of(&labels), 0, ms(0)).unwrap();
            for _ in 0..n {
                driver.tick();
            }
            assert_eq!(driver.state().unwrap().segment_index, 0, "n = {}", n);
        }
    }

    #[test]
    fn test_run_length_counts_and_resets() {
        use EmotionLabel::*;
        let k = 5;
        let mut labels = vec![Joy];
        labels.extend(std::iter::repeat(Sadness).take(k));
        labels.push(Anger);

        let mut driver = TimelineDriver::new(ms(1800));
        driver.start(speech_of(&labels), 0, ms(0)).unwrap();
        for _ in 0..k {
            driver.tick();
        }
        // segments 1..=k are sadness; the first of them started a new run
        assert_eq!(driver.state().unwrap().run_length, k as u32);

        let state = driver.tick().unwrap();
        assert_eq!(state.dominant, Anger);
        assert_eq!(state.run_length, 1);
        assert_eq!(state.last_dominant, Some(Anger));
    }

    #[test]
    fn test_dominant_uses_max_weight_first_on_ties() {
        let segments = vec![
            SpeechSegment::single("a", EmotionLabel::Neutral),
            SpeechSegment::new(
                "b",
                vec![
                    EmotionScore::new(EmotionLabel::Fear, 0.2),
                    EmotionScore::new(EmotionLabel::Joy, 0.4),
                    EmotionScore::new(EmotionLabel::Anger, 0.4),
                ],
            ),
        ];
        let mut driver = TimelineDriver::new(ms(1800));
        driver.start(Arc::new(Speech::new("t", segments)), 0, ms(0)).unwrap();
        assert_eq!(driver.tick().unwrap().dominant, EmotionLabel::Joy);
    }

    #[test]
    fn test_listeners_notified_before_return() {
        let mut driver = TimelineDriver::new(ms(1800));
        driver
            .start(speech_of(&[EmotionLabel::Joy, EmotionLabel::Joy]), 0, ms(0))
            .unwrap();
        let mut a = Recorder::default();
        let mut b = Recorder::default();
        driver.tick_with(&mut [&mut a, &mut b]);
        assert_eq!(a.seen, vec![(1, EmotionLabel::Joy, 2)]);
        assert_eq!(a.seen, b.seen);
    }

    #[test]
    fn test_stop_then_start_never_double_fires() {
        let labels = [EmotionLabel::Joy, EmotionLabel::Fear, EmotionLabel::Anger];
        let mut driver = TimelineDriver::new(ms(1800));
        driver.start(speech_of(&labels), 0, ms(0)).unwrap();
        driver.stop();
        driver.start(speech_of(&labels), 0, ms(600)).unwrap();

        let mut rec = Recorder::default();
        // the first start's deadline at 1800 must not fire
        assert_eq!(driver.poll(ms(1900), &mut [&mut rec]), 0);
        assert_eq!(driver.poll(ms(2400), &mut [&mut rec]), 1);
        assert_eq!(driver.poll(ms(2500), &mut [&mut rec]), 0);
        assert_eq!(rec.seen.len(), 1);
    }

    #[test]
    fn test_double_start_keeps_one_timer() {
        let labels = [EmotionLabel::Joy, EmotionLabel::Fear];
        let mut driver = TimelineDriver::new(ms(1000));
        driver.start(speech_of(&labels), 0, ms(0)).unwrap();
        driver.start(speech_of(&labels), 0, ms(500)).unwrap();
        assert_eq!(driver.poll(ms(1000), &mut []), 0);
        assert_eq!(driver.poll(ms(1500), &mut []), 1);
    }

    #[test]
    fn test_no_ticks_after_stop() {
        let mut driver = TimelineDriver::new(ms(100));
        driver.start(speech_of(&[EmotionLabel::Joy]), 0, ms(0)).unwrap();
        driver.stop();
        assert_eq!(driver.poll(ms(10_000), &mut []), 0);
        assert!(driver.tick().is_none());
        assert!(driver.current_segment().is_none());
    }

    #[test]
    fn test_zero_period_driver_polls_without_ticking() {
        let mut driver = TimelineDriver::new(Duration::ZERO);
        driver.start(speech_of(&[EmotionLabel::Joy, EmotionLabel::Fear]), 0, ms(0)).unwrap();
        assert_eq!(driver.poll(ms(5_000), &mut []), 0);
        // manual ticks still advance
        assert_eq!(driver.tick().unwrap().segment_index, 1);
    }

    #[test]
    fn test_restart_clears_run() {
        let mut driver = TimelineDriver::new(ms(100));
        driver
            .start(speech_of(&[EmotionLabel::Joy, EmotionLabel::Joy, EmotionLabel::Joy]), 2, ms(0))
            .unwrap();
        driver.tick();
        driver.tick();
        assert_eq!(driver.state().unwrap().run_length, 3);

        let state = driver.restart(ms(250)).unwrap();
        assert_eq!(state.segment_index, 0);
        assert_eq!(state.run_length, 0);
        assert_eq!(state.speech_index, 2);
        assert_eq!(driver.tick().unwrap().run_length, 1);
    }

    #[test]
    fn test_restart_while_stopped_fails() {
        let mut driver = TimelineDriver::new(ms(100));
        assert!(driver.restart(ms(0)).is_err());
    }
}
