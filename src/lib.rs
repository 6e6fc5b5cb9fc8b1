//! # Emoscape - emotion-driven audiovisual engine
//!
//! Plays back speeches annotated with per-segment emotion scores as a
//! procedural soundscape and a distorting 3-D particle field.
//!
//! ## Features
//!
//! - **Emotion timeline**: walks segments at a fixed cadence, tracks the
//!   dominant emotion and how long it has persisted
//! - **Particle field**: a 10×10×10 lattice plus wireframe, displaced per
//!   emotion and escalating with the run length
//! - **Procedural audio**: sentiment pad, emotion-pitched lead and an
//!   escalating drum loop over a pluggable synthesis graph
//! - **Offline rendering**: a built-in synthesizer that renders to WAV
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use emoscape::{Engine, EngineConfig, Speech, Synthesizer};
//!
//! let speeches = Speech::collection_from_json(&std::fs::read_to_string("speeches.json")?)?;
//! let config = EngineConfig::default();
//! let mut engine = Engine::new(config.clone(), Synthesizer::new(config.audio.sample_rate))?;
//!
//! engine.start(Arc::new(speeches[0].clone()), 0, Duration::ZERO)?;
//! engine.update(Duration::from_millis(16));
//! let frame = engine.frame();
//! ```

pub mod audio;
pub mod config;
pub mod core;
pub mod emotion;
pub mod engine;
pub mod field;
pub mod presentation;
pub mod timeline;

pub use audio::{AudioCommand, AudioLayer, LayerStatus, NullGraph, RecordingGraph, SynthesisGraph, Synthesizer, ToneStyle};
pub use config::{AudioConfig, EngineConfig, EngineConfigBuilder, FieldConfig, TimelineConfig};
pub use core::error::{AudioOperation, EngineError, Result, ResultExt};
pub use emotion::{EmotionLabel, EmotionScore, SentimentCategory, Speech, SpeechSegment};
pub use engine::{Engine, StartReport, UpdateReport};
pub use field::{Field, FieldStats};
pub use presentation::{FieldFrame, Rgb};
pub use timeline::{TimelineDriver, TimelineListener, TimelineState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
