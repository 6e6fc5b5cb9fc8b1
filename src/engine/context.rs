//! Engine context
//!
//! Owns one timeline, one field and one audio layer. The host drives it
//! from a single thread: `update(now)` once per rendered frame, plus the
//! lifecycle calls from its UI.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::audio::{AudioLayer, LayerStatus, SynthesisGraph, Synthesizer, ToneStyle};
use crate::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::emotion::{Speech, SpeechSegment};
use crate::field::Field;
use crate::presentation::FieldFrame;
use crate::timeline::{TimelineDriver, TimelineState};

/// Outcome of starting playback
#[derive(Debug, Clone)]
pub struct StartReport {
    pub state: TimelineState,
    /// Set once, on the start where the audio graph refused to come up
    pub audio_error: Option<EngineError>,
}

impl StartReport {
    pub fn audio_ok(&self) -> bool {
        self.audio_error.is_none()
    }
}

/// Outcome of one host frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateReport {
    /// Timeline ticks fired during this update
    pub ticks: u32,
    /// Whether the field advanced a frame
    pub frame_advanced: bool,
    pub state: Option<TimelineState>,
}

/// The emotion-driven audiovisual engine
pub struct Engine<G: SynthesisGraph> {
    config: EngineConfig,
    timeline: TimelineDriver,
    field: Field,
    audio: AudioLayer<G>,
}

impl<G: SynthesisGraph> Engine<G> {
    /// Build an engine around `graph`
    pub fn new(config: EngineConfig, graph: G) -> Result<Self> {
        config.validate()?;
        let field = Field::new(&config.field);
        Ok(Self::assemble(config, graph, field))
    }

    /// Build an engine whose fear jitter is reproducible
    pub fn with_seed(config: EngineConfig, graph: G, seed: u64) -> Result<Self> {
        config.validate()?;
        let field = Field::with_seed(&config.field, seed);
        Ok(Self::assemble(config, graph, field))
    }

    fn assemble(config: EngineConfig, graph: G, field: Field) -> Self {
        Self {
            timeline: TimelineDriver::new(config.timeline.tick_interval()),
            audio: AudioLayer::new(graph, &config.audio),
            field,
            config,
        }
    }

    /// Start playing `speech` from its first segment.
    ///
    /// An empty speech is refused and leaves any current playback alone.
    /// An audio failure does not fail the start; it is reported once in
    /// the returned [`StartReport`].
    pub fn start(&mut self, speech: Arc<Speech>, speech_index: usize, now: Duration) -> Result<StartReport> {
        let state = self.timeline.start(Arc::clone(&speech), speech_index, now)?;
        Ok(self.begin_layers(&speech, state, now))
    }

    /// Switch to another speech. Playback restarts at segment 0 with the
    /// run counter cleared; when stopped this is the same as `start`.
    pub fn select_speech(&mut self, speech: Arc<Speech>, speech_index: usize, now: Duration) -> Result<StartReport> {
        if !self.is_playing() {
            return self.start(speech, speech_index, now);
        }
        let state = self.timeline.select(Arc::clone(&speech), speech_index, now)?;
        info!(speech_index, "speech changed");
        Ok(self.begin_layers(&speech, state, now))
    }

    fn begin_layers(&mut self, speech: &Speech, state: TimelineState, now: Duration) -> StartReport {
        self.field.set_emotion(state.dominant, state.run_length);
        self.audio.on_stop();
        let audio_error = self.audio.on_speech_start(speech, state.dominant, now).err();
        StartReport { state, audio_error }
    }

    /// Advance the host frame at `now`: fire due ticks, move the field,
    /// flush due percussion. Does nothing while stopped.
    pub fn update(&mut self, now: Duration) -> UpdateReport {
        if !self.timeline.is_running() {
            return UpdateReport::default();
        }
        let ticks = self.timeline.poll(now, &mut [&mut self.field, &mut self.audio]);
        self.field.advance_frame(now);
        self.audio.advance(now);
        UpdateReport {
            ticks,
            frame_advanced: true,
            state: self.timeline.state().copied(),
        }
    }

    /// Advance the timeline immediately, outside the schedule
    pub fn tick(&mut self) -> Option<TimelineState> {
        self.timeline.tick_with(&mut [&mut self.field, &mut self.audio])
    }

    /// Cancel the schedule, tear down all voices and freeze the field
    pub fn stop(&mut self) {
        self.timeline.stop();
        self.audio.on_stop();
        self.field.pause();
    }

    /// Change timbre. While playing this restarts the speech at segment 0
    /// with the run counter cleared.
    pub fn set_style(&mut self, style: ToneStyle, now: Duration) -> Result<Option<StartReport>> {
        self.config.audio.style = style;
        self.audio.set_style(style);
        if !self.is_playing() {
            return Ok(None);
        }

        let state = self.timeline.restart(now)?;
        let speech = match self.timeline.speech() {
            Some(speech) => Arc::clone(speech),
            None => {
                warn!("timeline lost its speech during restart");
                return Ok(None);
            }
        };
        Ok(Some(self.begin_layers(&speech, state, now)))
    }

    /// Change master volume, clamped to [0, 1]
    pub fn set_volume(&mut self, volume: f32) {
        self.audio.set_volume(volume);
        self.config.audio.volume = self.audio.volume();
    }

    pub fn is_playing(&self) -> bool {
        self.timeline.is_running()
    }

    pub fn state(&self) -> Option<&TimelineState> {
        self.timeline.state()
    }

    pub fn current_segment(&self) -> Option<&SpeechSegment> {
        self.timeline.current_segment()
    }

    /// Snapshot for the renderer
    pub fn frame(&self) -> FieldFrame {
        FieldFrame::capture(&self.field, self.current_segment())
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn audio_status(&self) -> LayerStatus {
        self.audio.status()
    }

    pub fn style(&self) -> ToneStyle {
        self.audio.style()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &G {
        self.audio.graph()
    }

    pub fn graph_mut(&mut self) -> &mut G {
        self.audio.graph_mut()
    }
}

impl Engine<Synthesizer> {
    /// Render audio up to `now`, then run [`Engine::update`].
    ///
    /// Commands the update sends are timed from `now` on the synth clock,
    /// so percussion delays land where the loop scheduled them.
    pub fn render_frame(&mut self, now: Duration) -> (UpdateReport, Vec<f32>) {
        let samples = self.graph_mut().render_until(now.as_secs_f64());
        (self.update(now), samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingGraph;
    use crate::emotion::EmotionLabel;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn speech(labels: &[EmotionLabel]) -> Arc<Speech> {
        Arc::new(Speech::new(
            "test",
            labels.iter().map(|&l| SpeechSegment::single(l.name(), l)).collect(),
        ))
    }

    fn engine() -> Engine<RecordingGraph> {
        Engine::with_seed(EngineConfig::default(), RecordingGraph::new(), 7).unwrap()
    }

    #[test]
    fn test_start_and_tick_on_schedule() {
        let mut engine = engine();
        let report = engine
            .start(speech(&[EmotionLabel::Joy, EmotionLabel::Anger]), 0, ms(0))
            .unwrap();
        assert!(report.audio_ok());
        assert_eq!(report.state.run_length, 1);

        assert_eq!(engine.update(ms(1000)).ticks, 0);
        let report = engine.update(ms(1800));
        assert_eq!(report.ticks, 1);
        assert_eq!(report.state.unwrap().dominant, EmotionLabel::Anger);
        assert_eq!(engine.field().label(), EmotionLabel::Anger);
        assert_eq!(engine.current_segment().unwrap().text, "anger");
    }

    #[test]
    fn test_empty_speech_refused() {
        let mut engine = engine();
        assert!(engine.start(speech(&[]), 0, ms(0)).is_err());
        assert!(!engine.is_playing());
        assert!(engine.graph().commands().is_empty());
    }

    #[test]
    fn test_stop_halts_everything() {
        let mut engine = engine();
        engine.start(speech(&[EmotionLabel::Joy, EmotionLabel::Fear]), 0, ms(0)).unwrap();
        engine.update(ms(16));
        engine.stop();

        assert!(engine.graph().sounding().is_silent());
        let frame_time = engine.field().clock().time();
        let commands = engine.graph().commands().len();

        let report = engine.update(ms(60_000));
        assert_eq!(report, UpdateReport::default());
        assert_eq!(engine.field().clock().time(), frame_time);
        assert_eq!(engine.graph().commands().len(), commands);
        assert!(engine.tick().is_none());
    }

    #[test]
    fn test_style_change_restarts_timeline() {
        let mut engine = engine();
        let labels = [EmotionLabel::Joy, EmotionLabel::Joy, EmotionLabel::Joy];
        engine.start(speech(&labels), 0, ms(0)).unwrap();
        engine.tick();
        assert_eq!(engine.state().unwrap().run_length, 2);

        let report = engine.set_style(ToneStyle::Synthwave, ms(500)).unwrap().unwrap();
        assert_eq!(report.state.segment_index, 0);
        assert_eq!(report.state.run_length, 0);
        assert_eq!(engine.style(), ToneStyle::Synthwave);
        // old voices released before the new pad
        assert!(engine.graph().sounding().pad);
        assert_eq!(engine.graph().count("pad_attack"), 2);
        assert_eq!(engine.graph().count("pad_release_all"), 1);

        // the next scheduled tick is one period after the restart
        assert_eq!(engine.update(ms(1800)).ticks, 0);
        assert_eq!(engine.update(ms(2300)).ticks, 1);
    }

    #[test]
    fn test_style_change_while_stopped_only_records() {
        let mut engine = engine();
        assert!(engine.set_style(ToneStyle::Ambient, ms(0)).unwrap().is_none());
        assert_eq!(engine.config().audio.style, ToneStyle::Ambient);
        assert!(engine.graph().commands().is_empty());
    }

    #[test]
    fn test_audio_failure_keeps_visuals() {
        let mut engine = Engine::with_seed(EngineConfig::default(), RecordingGraph::refusing(), 1).unwrap();
        let report = engine.start(speech(&[EmotionLabel::Sadness, EmotionLabel::Joy]), 0, ms(0)).unwrap();
        assert!(report.audio_error.is_some());
        assert_eq!(engine.audio_status(), LayerStatus::Disabled);

        engine.update(ms(16));
        assert_eq!(engine.update(ms(1800)).ticks, 1);
        assert!(engine.field().clock().time() > 0.0);

        engine.stop();
        let again = engine.start(speech(&[EmotionLabel::Joy]), 0, ms(5000)).unwrap();
        assert!(again.audio_ok());
        assert_eq!(engine.graph().starts(), 1);
    }

    #[test]
    fn test_select_speech_resets_run() {
        let mut engine = engine();
        engine.start(speech(&[EmotionLabel::Joy, EmotionLabel::Joy]), 0, ms(0)).unwrap();
        engine.tick();
        let report = engine
            .select_speech(speech(&[EmotionLabel::Fear, EmotionLabel::Fear]), 4, ms(100))
            .unwrap();
        assert_eq!(report.state.speech_index, 4);
        assert_eq!(report.state.run_length, 0);
        assert_eq!(engine.tick().unwrap().run_length, 1);
    }

    #[test]
    fn test_frame_reflects_segment() {
        let mut engine = engine();
        engine.start(speech(&[EmotionLabel::Surprise]), 0, ms(0)).unwrap();
        engine.update(ms(0));
        engine.update(ms(20));
        let frame = engine.frame();
        assert_eq!(frame.dominant, EmotionLabel::Surprise);
        assert_eq!(frame.glow, 0.85);
        assert!(frame.time > 0.0);
    }

    #[test]
    fn test_volume_clamped() {
        let mut engine = engine();
        engine.set_volume(-1.0);
        assert_eq!(engine.config().audio.volume, 0.0);
    }
}
