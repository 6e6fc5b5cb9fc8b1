//! Emotion data model
//!
//! - 7 emotion labels with lenient parsing
//! - Weighted scores and dominant-label selection
//! - Speech segments and speech metadata (overall sentiment)

pub mod label;
pub mod speech;

pub use label::{dominant_label, normalized_weights, EmotionLabel, EmotionScore, EMOTION_COUNT};
pub use speech::{SentimentCategory, Speech, SpeechSegment};
