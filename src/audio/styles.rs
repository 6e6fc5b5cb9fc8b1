//! Timbre style presets
//!
//! A style bundles the foreground voice's oscillator per emotion, its
//! envelope, portamento, the per-emotion low-pass cutoff and the note
//! duration. Three presets exist; `lofi` is the default.

use serde::{Deserialize, Serialize};

use crate::emotion::EmotionLabel;

/// Selectable timbre preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneStyle {
    Ambient,
    Synthwave,
    #[default]
    Lofi,
}

impl ToneStyle {
    /// Lowercase preset name
    pub fn name(&self) -> &'static str {
        match self {
            ToneStyle::Ambient => "ambient",
            ToneStyle::Synthwave => "synthwave",
            ToneStyle::Lofi => "lofi",
        }
    }

    /// Parse a preset name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ambient" => Some(ToneStyle::Ambient),
            "synthwave" => Some(ToneStyle::Synthwave),
            "lofi" | "lo-fi" => Some(ToneStyle::Lofi),
            _ => None,
        }
    }

    /// Every preset
    pub fn all() -> &'static [ToneStyle; 3] {
        &[ToneStyle::Ambient, ToneStyle::Synthwave, ToneStyle::Lofi]
    }

    /// Full parameter set for this preset
    pub fn config(&self) -> StyleConfig {
        match self {
            ToneStyle::Ambient => StyleConfig {
                style: *self,
                voicing: Voicing::Partials(4),
                envelope: Envelope::new(0.3, 0.4, 0.6, 2.5),
                portamento: 0.0,
                duration: NoteValue::Half,
            },
            ToneStyle::Synthwave => StyleConfig {
                style: *self,
                voicing: Voicing::Unison {
                    count: 3,
                    spread_cents: 40.0,
                },
                envelope: Envelope::new(0.05, 0.3, 0.4, 0.8),
                portamento: 0.05,
                duration: NoteValue::Quarter,
            },
            ToneStyle::Lofi => StyleConfig {
                style: *self,
                voicing: Voicing::Unison {
                    count: 2,
                    spread_cents: 15.0,
                },
                envelope: Envelope::new(0.08, 0.5, 0.5, 1.2),
                portamento: 0.02,
                duration: NoteValue::DottedQuarter,
            },
        }
    }
}

impl std::fmt::Display for ToneStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ToneStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToneStyle::parse(s).ok_or_else(|| format!("unknown style '{}'", s))
    }
}

/// Basic oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
    /// Sine with its octave mixed in
    Sine2,
    /// Pulse whose width is swept slowly
    Pwm,
}

/// How the foreground voice stacks oscillators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Voicing {
    /// Harmonic partials of a single oscillator
    Partials(u32),
    /// Detuned copies spread symmetrically in cents
    Unison { count: u32, spread_cents: f32 },
}

impl Voicing {
    /// Number of oscillators sounding per note
    pub fn voices(&self) -> u32 {
        match self {
            Voicing::Partials(_) => 1,
            Voicing::Unison { count, .. } => (*count).max(1),
        }
    }
}

/// Attack/decay/release in seconds, sustain as a level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Envelope {
    pub const fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Level `elapsed` seconds after the attack began, while held
    pub fn held_level(&self, elapsed: f32) -> f32 {
        if elapsed < 0.0 {
            0.0
        } else if elapsed < self.attack {
            elapsed / self.attack
        } else if elapsed < self.attack + self.decay {
            let d = (elapsed - self.attack) / self.decay;
            1.0 - (1.0 - self.sustain) * d
        } else {
            self.sustain
        }
    }

    /// Level `since` seconds after release, starting from `from`
    pub fn released_level(&self, from: f32, since: f32) -> f32 {
        if self.release <= 0.0 || since >= self.release {
            0.0
        } else {
            from * (1.0 - since / self.release)
        }
    }
}

/// Musical note length, relative to the transport tempo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteValue {
    Whole,
    Half,
    DottedQuarter,
    Quarter,
    Eighth,
}

impl NoteValue {
    /// Length in beats (quarter notes)
    pub fn beats(&self) -> f32 {
        match self {
            NoteValue::Whole => 4.0,
            NoteValue::Half => 2.0,
            NoteValue::DottedQuarter => 1.5,
            NoteValue::Quarter => 1.0,
            NoteValue::Eighth => 0.5,
        }
    }

    /// Length in seconds at `bpm`
    pub fn seconds(&self, bpm: f32) -> f32 {
        self.beats() * 60.0 / bpm
    }
}

/// Resolved parameters of one style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleConfig {
    pub style: ToneStyle,
    pub voicing: Voicing,
    pub envelope: Envelope,
    /// Glide time between consecutive notes, seconds
    pub portamento: f32,
    pub duration: NoteValue,
}

impl StyleConfig {
    /// Oscillator shape used for `label`
    pub fn waveform(&self, label: EmotionLabel) -> Waveform {
        use EmotionLabel::*;
        match (self.style, label) {
            (ToneStyle::Ambient, Joy | Surprise) => Waveform::Triangle,
            (ToneStyle::Ambient, Anger) => Waveform::Sawtooth,
            (ToneStyle::Ambient, Fear) => Waveform::Sine2,
            (ToneStyle::Ambient, Disgust) => Waveform::Square,
            (ToneStyle::Ambient, Sadness | Neutral) => Waveform::Sine,

            (ToneStyle::Synthwave, Joy | Sadness | Surprise) => Waveform::Sawtooth,
            (ToneStyle::Synthwave, Anger | Disgust) => Waveform::Square,
            (ToneStyle::Synthwave, Fear) => Waveform::Pwm,
            (ToneStyle::Synthwave, Neutral) => Waveform::Triangle,

            (ToneStyle::Lofi, Joy | Fear | Surprise) => Waveform::Triangle,
            (ToneStyle::Lofi, Anger) => Waveform::Sawtooth,
            (ToneStyle::Lofi, Disgust) => Waveform::Square,
            (ToneStyle::Lofi, Sadness | Neutral) => Waveform::Sine,
        }
    }

    /// Low-pass cutoff in Hz used for `label`
    pub fn cutoff(&self, label: EmotionLabel) -> f32 {
        use EmotionLabel::*;
        let table: [f32; 7] = match self.style {
            // anger, disgust, fear, joy, neutral, sadness, surprise
            ToneStyle::Ambient => [1200.0, 800.0, 1500.0, 3000.0, 2000.0, 1000.0, 2500.0],
            ToneStyle::Synthwave => [1800.0, 1000.0, 2000.0, 4000.0, 2500.0, 1200.0, 3500.0],
            ToneStyle::Lofi => [800.0, 600.0, 1000.0, 1800.0, 1200.0, 700.0, 1500.0],
        };
        let idx = match label {
            Anger => 0,
            Disgust => 1,
            Fear => 2,
            Joy => 3,
            Neutral => 4,
            Sadness => 5,
            Surprise => 6,
        };
        table[idx]
    }
}
