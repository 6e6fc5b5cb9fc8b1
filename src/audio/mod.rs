//! Procedural audio
//!
//! - `styles`: timbre presets (oscillator, envelope, cutoff tables)
//! - `notes`: emotion pitches and sentiment chords
//! - `graph`: the write-only synthesis boundary and test recorders
//! - `percussion`: escalating drum patterns
//! - `layer`: the emotion-driven audio layer
//! - `synth`: offline PCM renderer implementing the graph
//! - `output`: WAV files and live playback

pub mod graph;
pub mod layer;
pub mod notes;
pub mod output;
pub mod percussion;
pub mod styles;
pub mod synth;

pub use graph::{AudioCommand, Drum, DrumHit, NullGraph, RecordingGraph, SoundingVoices, SynthesisGraph};
pub use layer::{AudioLayer, LayerStatus};
pub use notes::{emotion_note, sentiment_chord, Note};
pub use output::{WavFormat, WavSink};
pub use percussion::{
    embellishments, escalation_level, measure_hits, Embellishment, PercussionLoop,
    ESCALATION_THRESHOLDS, PERCUSSION_WARMUP_TICKS,
};
pub use styles::{Envelope, NoteValue, StyleConfig, ToneStyle, Voicing, Waveform};
pub use synth::Synthesizer;

#[cfg(feature = "playback")]
pub use output::StreamingPlayer;
