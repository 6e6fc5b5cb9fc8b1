//! Speech data model
//!
//! A speech is an ordered list of emotion-scored text segments plus the
//! metadata the upstream extractor attached to it. It is immutable once
//! loaded and shared with the engine behind an `Arc`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::label::{dominant_label, normalized_weights, EmotionLabel, EmotionScore, EMOTION_COUNT};
use crate::core::error::{EngineError, Result};

/// One line of text with its emotion scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechSegment {
    /// Spoken text
    #[serde(default)]
    pub text: String,
    /// Scores, conventionally sorted by descending weight
    #[serde(rename = "emotionScores", default)]
    pub scores: Vec<EmotionScore>,
}

impl SpeechSegment {
    /// Create a segment from text and scores
    pub fn new(text: impl Into<String>, scores: Vec<EmotionScore>) -> Self {
        Self {
            text: text.into(),
            scores,
        }
    }

    /// Segment with a single fully-weighted label
    pub fn single(text: impl Into<String>, label: EmotionLabel) -> Self {
        Self::new(text, vec![EmotionScore::new(label, 1.0)])
    }

    /// Highest-weighted label (first on ties, `Neutral` when empty)
    pub fn dominant(&self) -> EmotionLabel {
        dominant_label(&self.scores)
    }

    /// Normalized per-label weights
    pub fn weights(&self) -> [f32; EMOTION_COUNT] {
        normalized_weights(&self.scores)
    }
}

/// Overall sentiment of a whole speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SentimentCategory {
    VeryNegative,
    Negative,
    #[default]
    Neutral,
    Positive,
    VeryPositive,
}

impl SentimentCategory {
    /// Name as written by the sentiment extractor
    pub fn name(&self) -> &'static str {
        match self {
            SentimentCategory::VeryNegative => "very_negative",
            SentimentCategory::Negative => "negative",
            SentimentCategory::Neutral => "neutral",
            SentimentCategory::Positive => "positive",
            SentimentCategory::VeryPositive => "very_positive",
        }
    }

    /// Parse a category, falling back to `Neutral`
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "very_negative" => SentimentCategory::VeryNegative,
            "negative" => SentimentCategory::Negative,
            "positive" => SentimentCategory::Positive,
            "very_positive" => SentimentCategory::VeryPositive,
            _ => SentimentCategory::Neutral,
        }
    }

    /// All categories from most negative to most positive
    pub fn all() -> &'static [SentimentCategory; 5] {
        &[
            SentimentCategory::VeryNegative,
            SentimentCategory::Negative,
            SentimentCategory::Neutral,
            SentimentCategory::Positive,
            SentimentCategory::VeryPositive,
        ]
    }
}

impl std::fmt::Display for SentimentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for SentimentCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SentimentCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SentimentCategory::parse_lenient(&raw))
    }
}

/// A complete speech with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speech {
    /// Speaker name
    #[serde(default)]
    pub speaker: String,
    /// Event the speech was given at
    #[serde(default)]
    pub event: String,
    /// Date as written in the source (dd.MM.yyyy)
    #[serde(default)]
    pub date: String,
    /// Overall sentiment category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentCategory>,
    /// Confidence of the overall sentiment
    #[serde(rename = "sentimentScore", default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f32>,
    /// Ordered segments
    #[serde(rename = "lines", default)]
    pub segments: Vec<SpeechSegment>,
}

impl Speech {
    /// Create a speech without sentiment metadata
    pub fn new(speaker: impl Into<String>, segments: Vec<SpeechSegment>) -> Self {
        Self {
            speaker: speaker.into(),
            event: String::new(),
            date: String::new(),
            sentiment: None,
            sentiment_score: None,
            segments,
        }
    }

    /// Set the overall sentiment
    pub fn with_sentiment(mut self, sentiment: SentimentCategory, score: f32) -> Self {
        self.sentiment = Some(sentiment);
        self.sentiment_score = Some(score);
        self
    }

    /// Set event and date
    pub fn with_event(mut self, event: impl Into<String>, date: impl Into<String>) -> Self {
        self.event = event.into();
        self.date = date.into();
        self
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the speech has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment at `index`
    pub fn segment(&self, index: usize) -> Option<&SpeechSegment> {
        self.segments.get(index)
    }

    /// Sentiment, `Neutral` when the extractor gave none
    pub fn sentiment_or_neutral(&self) -> SentimentCategory {
        self.sentiment.unwrap_or_default()
    }

    /// Short human-readable title
    pub fn title(&self) -> String {
        match (self.event.is_empty(), self.date.is_empty()) {
            (false, false) => format!("{} - {} ({})", self.speaker, self.event, self.date),
            (false, true) => format!("{} - {}", self.speaker, self.event),
            _ => self.speaker.clone(),
        }
    }

    /// Check the speech can drive a timeline
    pub fn validate(&self) -> Result<()> {
        if self.segments.is_empty() {
            return Err(EngineError::Timeline {
                message: "speech has no segments".to_string(),
                speech: Some(self.title()),
            });
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if let Some(bad) = segment.scores.iter().find(|s| !s.weight.is_finite() || s.weight < 0.0) {
                return Err(EngineError::Validation {
                    message: format!("score {} for {} is not a non-negative number", bad.weight, bad.label),
                    field: Some(format!("lines[{}].emotionScores", i)),
                });
            }
        }
        Ok(())
    }

    /// Parse a JSON array of speeches
    pub fn collection_from_json(json: &str) -> Result<Vec<Speech>> {
        Ok(serde_json::from_str(json)?)
    }
}
