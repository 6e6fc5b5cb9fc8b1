//! Procedural audio layer
//!
//! Three sub-layers share one synthesis graph:
//!
//! - **Pad**: the speech's sentiment chord, attacked on start and held
//! - **Lead**: one note per tick, pitch from the dominant emotion, timbre
//!   from the active style
//! - **Percussion**: a whole-note loop armed after the warm-up ticks, its
//!   pattern escalating with the run length
//!
//! A graph that fails to start disables the layer for good. The failure is
//! returned once; the visual side keeps running.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::graph::{AudioCommand, SynthesisGraph};
use super::notes::{emotion_note, sentiment_chord};
use super::percussion::{escalation_level, PercussionLoop, PERCUSSION_WARMUP_TICKS};
use super::styles::{StyleConfig, ToneStyle};
use crate::config::AudioConfig;
use crate::core::error::Result;
use crate::emotion::{EmotionLabel, Speech, SpeechSegment};
use crate::timeline::{TimelineListener, TimelineState};

/// Seconds for a volume change to settle
pub const VOLUME_RAMP: f32 = 0.1;
/// Seconds for the lead filter to reach a new cutoff
pub const FILTER_RAMP: f32 = 0.3;
/// Pad envelope, seconds
pub const PAD_ATTACK: f32 = 2.0;
pub const PAD_RELEASE: f32 = 10.0;

/// Lifecycle of the layer's connection to its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerStatus {
    /// Graph not started yet
    Idle,
    /// Graph up, no speech playing
    Ready,
    /// Voices sounding for a speech
    Playing,
    /// Graph refused to start; all calls are ignored
    Disabled,
}

/// Per-speech voice state, rebuilt on every start and style change
#[derive(Debug, Clone)]
struct VoiceState {
    style: StyleConfig,
    lead: Option<EmotionLabel>,
    run_length: u32,
    level: usize,
}

/// Emotion-driven soundscape over a [`SynthesisGraph`]
pub struct AudioLayer<G: SynthesisGraph> {
    graph: G,
    style: ToneStyle,
    volume: f32,
    bpm: f32,
    status: LayerStatus,
    voice: Option<VoiceState>,
    percussion: PercussionLoop,
}

impl<G: SynthesisGraph> AudioLayer<G> {
    pub fn new(graph: G, config: &AudioConfig) -> Self {
        Self {
            graph,
            style: config.style,
            volume: config.volume.clamp(0.0, 1.0),
            bpm: config.bpm,
            status: LayerStatus::Idle,
            voice: None,
            percussion: PercussionLoop::new(config.bpm),
        }
    }

    /// Start voices for `speech`, beginning with `first`.
    ///
    /// The graph is started on the first call only. If it refuses, the
    /// error is returned here and every later call is a silent no-op.
    pub fn on_speech_start(&mut self, speech: &Speech, first: EmotionLabel, now: Duration) -> Result<()> {
        match self.status {
            LayerStatus::Disabled => return Ok(()),
            LayerStatus::Idle => {
                if let Err(e) = self.graph.start() {
                    warn!(error = %e, "audio graph failed to start; continuing without sound");
                    self.status = LayerStatus::Disabled;
                    return Err(e);
                }
                self.status = LayerStatus::Ready;
            }
            LayerStatus::Playing => self.release_voices(),
            LayerStatus::Ready => {}
        }

        let sentiment = speech.sentiment_or_neutral();
        let chord: Vec<f32> = sentiment_chord(sentiment).iter().map(|n| n.frequency()).collect();

        self.graph.send(AudioCommand::SetMasterGain {
            gain: self.volume,
            ramp: 0.0,
        });
        self.graph.send(AudioCommand::PadAttack {
            frequencies: chord,
            attack: PAD_ATTACK,
            release: PAD_RELEASE,
        });
        self.graph.send(AudioCommand::TransportStart { bpm: self.bpm });
        self.percussion.start_transport(now);

        self.voice = Some(VoiceState {
            style: self.style.config(),
            lead: None,
            run_length: 0,
            level: 0,
        });
        self.status = LayerStatus::Playing;
        info!(style = %self.style, %sentiment, "audio layer started");

        self.play(first);
        Ok(())
    }

    /// React to a timeline advance
    pub fn on_tick(&mut self, state: &TimelineState) {
        if self.status != LayerStatus::Playing {
            return;
        }
        self.play(state.dominant);

        if state.ticks == PERCUSSION_WARMUP_TICKS {
            self.percussion.arm();
            info!(ticks = state.ticks, "percussion armed");
        }

        if let Some(voice) = self.voice.as_mut() {
            voice.run_length = state.run_length;
            let level = escalation_level(state.run_length);
            if level != voice.level {
                debug!(from = voice.level, to = level, run = state.run_length, "percussion escalation");
                voice.level = level;
            }
        }
    }

    /// Flush percussion hits due at `now`
    pub fn advance(&mut self, now: Duration) {
        if self.status != LayerStatus::Playing {
            return;
        }
        let run = self.voice.as_ref().map_or(0, |v| v.run_length);
        for hit in self.percussion.due(now, run) {
            self.graph.send(AudioCommand::Drum(hit));
        }
    }

    /// Release every voice and stop the transport
    pub fn on_stop(&mut self) {
        if self.status == LayerStatus::Playing {
            self.release_voices();
            self.status = LayerStatus::Ready;
            info!("audio layer stopped");
        }
    }

    fn release_voices(&mut self) {
        self.graph.send(AudioCommand::LeadRelease);
        self.graph.send(AudioCommand::PadReleaseAll);
        self.graph.send(AudioCommand::TransportStop);
        self.percussion.stop();
        self.voice = None;
    }

    /// Change timbre. The caller restarts the timeline; voices are
    /// rebuilt by the following `on_speech_start`.
    pub fn set_style(&mut self, style: ToneStyle) {
        if self.style != style {
            info!(from = %self.style, to = %style, "style changed");
            self.style = style;
        }
    }

    /// Change master volume, clamped to [0, 1]
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if matches!(self.status, LayerStatus::Ready | LayerStatus::Playing) {
            self.graph.send(AudioCommand::SetMasterGain {
                gain: self.volume,
                ramp: VOLUME_RAMP,
            });
        }
    }

    fn play(&mut self, label: EmotionLabel) {
        let Some(voice) = self.voice.as_mut() else {
            return;
        };
        let style = voice.style;
        let note = emotion_note(label);

        self.graph.send(AudioCommand::LeadRelease);
        self.graph.send(AudioCommand::FilterCutoff {
            hz: style.cutoff(label),
            ramp: FILTER_RAMP,
        });
        self.graph.send(AudioCommand::LeadNote {
            frequency: note.frequency(),
            waveform: style.waveform(label),
            voicing: style.voicing,
            envelope: style.envelope,
            portamento: style.portamento,
            duration: style.duration.seconds(self.bpm),
        });
        voice.lead = Some(label);
        debug!(%label, %note, style = %style.style, "lead note");
    }

    pub fn status(&self) -> LayerStatus {
        self.status
    }

    pub fn style(&self) -> ToneStyle {
        self.style
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Label of the last lead note, while playing
    pub fn lead(&self) -> Option<EmotionLabel> {
        self.voice.as_ref().and_then(|v| v.lead)
    }

    /// Whether the percussion loop is armed
    pub fn percussion_active(&self) -> bool {
        self.percussion.is_active()
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }
}

impl<G: SynthesisGraph> TimelineListener for AudioLayer<G> {
    fn on_tick(&mut self, state: &TimelineState, _segment: &SpeechSegment) {
        AudioLayer::on_tick(self, state);
    }
}
