//! Pitch tables
//!
//! - MIDI note numbers to frequency (A4 = 440 Hz)
//! - Emotion to foreground pitch
//! - Sentiment category to background chord

use crate::emotion::{EmotionLabel, SentimentCategory};

/// A named pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub name: &'static str,
    /// MIDI note number
    pub midi: u8,
}

impl Note {
    /// Frequency in Hz
    pub fn frequency(&self) -> f32 {
        midi_to_hz(self.midi)
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Equal-tempered frequency of a MIDI note
pub fn midi_to_hz(midi: u8) -> f32 {
    440.0 * 2f32.powf((midi as f32 - 69.0) / 12.0)
}

const fn note(name: &'static str, midi: u8) -> Note {
    Note { name, midi }
}

/// Foreground pitch for an emotion
pub fn emotion_note(label: EmotionLabel) -> Note {
    match label {
        EmotionLabel::Anger => note("G2", 43),
        EmotionLabel::Disgust => note("Bb2", 46),
        EmotionLabel::Fear => note("Eb3", 51),
        EmotionLabel::Joy => note("C5", 72),
        EmotionLabel::Neutral => note("A3", 57),
        EmotionLabel::Sadness => note("D3", 50),
        EmotionLabel::Surprise => note("F#4", 66),
    }
}

/// Background chord voicing for a sentiment category
pub fn sentiment_chord(sentiment: SentimentCategory) -> &'static [Note] {
    const VERY_NEGATIVE: [Note; 3] = [note("C2", 36), note("Eb2", 39), note("Gb2", 42)];
    const NEGATIVE: [Note; 3] = [note("C2", 36), note("Eb2", 39), note("G2", 43)];
    const NEUTRAL: [Note; 3] = [note("C2", 36), note("F2", 41), note("A2", 45)];
    const POSITIVE: [Note; 3] = [note("C2", 36), note("E2", 40), note("G2", 43)];
    const VERY_POSITIVE: [Note; 4] = [note("C2", 36), note("E2", 40), note("G2", 43), note("B2", 47)];

    match sentiment {
        SentimentCategory::VeryNegative => &VERY_NEGATIVE,
        SentimentCategory::Negative => &NEGATIVE,
        SentimentCategory::Neutral => &NEUTRAL,
        SentimentCategory::Positive => &POSITIVE,
        SentimentCategory::VeryPositive => &VERY_POSITIVE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// MIDI number for a note name, `None` when malformed
    fn midi_number(name: &str) -> Option<u8> {
        let mut chars = name.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        let base: i32 = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };

        let rest: String = chars.collect();
        let (accidental, octave) = if let Some(r) = rest.strip_prefix('#') {
            (1, r)
        } else if let Some(r) = rest.strip_prefix('b') {
            (-1, r)
        } else {
            (0, rest.as_str())
        };

        let octave: i32 = octave.parse().ok()?;
        let midi = (octave + 1) * 12 + base + accidental;
        u8::try_from(midi).ok().filter(|m| *m <= 127)
    }

    #[test]
    fn test_midi_numbers() {
        assert_eq!(midi_number("A4"), Some(69));
        assert_eq!(midi_number("C5"), Some(72));
        assert_eq!(midi_number("F#4"), Some(66));
        assert_eq!(midi_number("Bb2"), Some(46));
        assert_eq!(midi_number("H2"), None);
        assert_eq!(midi_number("C"), None);
    }

    #[test]
    fn test_tables_match_names() {
        for &label in EmotionLabel::all() {
            let n = emotion_note(label);
            assert_eq!(midi_number(n.name), Some(n.midi), "{}", n.name);
        }
        for &s in SentimentCategory::all() {
            for n in sentiment_chord(s) {
                assert_eq!(midi_number(n.name), Some(n.midi), "{}", n.name);
            }
        }
    }

    #[test]
    fn test_frequencies() {
        assert!((midi_to_hz(69) - 440.0).abs() < 1e-3);
        assert!((emotion_note(EmotionLabel::Neutral).frequency() - 220.0).abs() < 1e-3);
    }

    #[test]
    fn test_chord_sizes() {
        assert_eq!(sentiment_chord(SentimentCategory::VeryPositive).len(), 4);
        assert_eq!(sentiment_chord(SentimentCategory::Negative).len(), 3);
    }
}
