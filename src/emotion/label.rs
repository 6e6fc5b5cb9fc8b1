//! Emotion labels and weighted scores
//!
//! The label set is closed: anything the classifier emits outside of it
//! is read as `Neutral` so lookups downstream never fail.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Emotion labels produced by the upstream classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum EmotionLabel {
    /// Angry, furious
    Anger,
    /// Disgusted, repulsed
    Disgust,
    /// Fearful, scared
    Fear,
    /// Happy, joyful
    Joy,
    /// Neutral, calm
    #[default]
    Neutral,
    /// Sad, melancholic
    Sadness,
    /// Surprised, amazed
    Surprise,
}

/// Number of labels in the closed set
pub const EMOTION_COUNT: usize = 7;

impl EmotionLabel {
    /// Get emotion name as emitted by the classifier
    pub fn name(&self) -> &'static str {
        match self {
            EmotionLabel::Anger => "anger",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Joy => "joy",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Surprise => "surprise",
        }
    }

    /// Stable index into per-label tables (alphabetical order)
    pub fn index(&self) -> usize {
        match self {
            EmotionLabel::Anger => 0,
            EmotionLabel::Disgust => 1,
            EmotionLabel::Fear => 2,
            EmotionLabel::Joy => 3,
            EmotionLabel::Neutral => 4,
            EmotionLabel::Sadness => 5,
            EmotionLabel::Surprise => 6,
        }
    }

    /// Parse a known label name, `None` for anything else
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "anger" | "angry" => Some(EmotionLabel::Anger),
            "disgust" | "disgusted" => Some(EmotionLabel::Disgust),
            "fear" | "fearful" => Some(EmotionLabel::Fear),
            "joy" | "happy" => Some(EmotionLabel::Joy),
            "neutral" => Some(EmotionLabel::Neutral),
            "sadness" | "sad" => Some(EmotionLabel::Sadness),
            "surprise" | "surprised" => Some(EmotionLabel::Surprise),
            _ => None,
        }
    }

    /// Parse a label, falling back to `Neutral` for unrecognized input
    pub fn parse_lenient(s: &str) -> Self {
        Self::from_name(s).unwrap_or_default()
    }

    /// Get all labels in index order
    pub fn all() -> &'static [EmotionLabel; EMOTION_COUNT] {
        &[
            EmotionLabel::Anger,
            EmotionLabel::Disgust,
            EmotionLabel::Fear,
            EmotionLabel::Joy,
            EmotionLabel::Neutral,
            EmotionLabel::Sadness,
            EmotionLabel::Surprise,
        ]
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for EmotionLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for EmotionLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(EmotionLabel::parse_lenient(&raw))
    }
}

/// A single (label, weight) pair attached to a segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    /// Emotion label
    pub label: EmotionLabel,
    /// Classifier confidence in [0, 1]
    #[serde(rename = "score")]
    pub weight: f32,
}

impl EmotionScore {
    /// Create a new score, clamping the weight into [0, 1]
    pub fn new(label: EmotionLabel, weight: f32) -> Self {
        let weight = if weight.is_finite() {
            weight.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { label, weight }
    }
}

/// Label with the highest weight; ties keep the earliest entry.
///
/// An empty list yields `Neutral`.
pub fn dominant_label(scores: &[EmotionScore]) -> EmotionLabel {
    let mut best: Option<&EmotionScore> = None;
    for score in scores {
        match best {
            Some(current) if score.weight <= current.weight => {}
            _ => best = Some(score),
        }
    }
    best.map(|s| s.label).unwrap_or_default()
}

/// Per-label weights normalized to sum to one.
///
/// Repeated labels accumulate. All zeros when the total weight is zero.
pub fn normalized_weights(scores: &[EmotionScore]) -> [f32; EMOTION_COUNT] {
    let mut weights = [0.0f32; EMOTION_COUNT];
    for score in scores {
        weights[score.label.index()] += score.weight.max(0.0);
    }
    let total: f32 = weights.iter().sum();
    if total > 0.0 {
        for w in &mut weights {
            *w /= total;
        }
    }
    weights
}
