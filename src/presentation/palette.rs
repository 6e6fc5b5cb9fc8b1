//! Emotion colors and glow
//!
//! Colors blend by weight but lean hard toward the dominant label: the
//! weighted average contributes 30%, the dominant label's pure color 70%.

use serde::{Deserialize, Serialize};

use crate::emotion::{dominant_label, normalized_weights, EmotionLabel, EmotionScore};

/// Share of the dominant label's pure color in a blend
pub const DOMINANT_MIX: f32 = 0.7;

/// Radius around the origin that receives core glow
pub const CORE_RADIUS: f32 = 6.0;

/// Linear RGB in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// From a 0xRRGGBB literal
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    pub fn to_hex(&self) -> String {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", channel(self.r), channel(self.g), channel(self.b))
    }

    /// `self` moved toward `other` by `t`
    pub fn mix(&self, other: Rgb, t: f32) -> Rgb {
        Rgb::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    pub fn scale(&self, k: f32) -> Rgb {
        Rgb::new(self.r * k, self.g * k, self.b * k)
    }

    pub fn add(&self, other: Rgb) -> Rgb {
        Rgb::new(self.r + other.r, self.g + other.g, self.b + other.b)
    }

    /// Euclidean distance in RGB space
    pub fn distance(&self, other: Rgb) -> f32 {
        ((self.r - other.r).powi(2) + (self.g - other.g).powi(2) + (self.b - other.b).powi(2)).sqrt()
    }
}

/// Pure color of a label
pub fn emotion_color(label: EmotionLabel) -> Rgb {
    Rgb::from_hex(match label {
        EmotionLabel::Anger => 0xcc1234,
        EmotionLabel::Disgust => 0x76ff03,
        EmotionLabel::Fear => 0x9c27ff,
        EmotionLabel::Joy => 0xd4a500,
        EmotionLabel::Neutral => 0x5a6c7a,
        EmotionLabel::Sadness => 0x2979ff,
        EmotionLabel::Surprise => 0xff4081,
    })
}

/// Core glow strength of a label
pub fn glow_intensity(label: EmotionLabel) -> f32 {
    match label {
        EmotionLabel::Joy => 0.9,
        EmotionLabel::Surprise => 0.85,
        EmotionLabel::Neutral => 0.6,
        EmotionLabel::Anger => 0.5,
        EmotionLabel::Sadness => 0.4,
        EmotionLabel::Fear => 0.35,
        EmotionLabel::Disgust => 0.3,
    }
}

/// Blend of all present labels, 70% toward the dominant one. White when
/// every weight is zero.
pub fn color_blend(scores: &[EmotionScore]) -> Rgb {
    let weights = normalized_weights(scores);
    if weights.iter().all(|&w| w == 0.0) {
        return Rgb::WHITE;
    }

    let average = EmotionLabel::all()
        .iter()
        .fold(Rgb::new(0.0, 0.0, 0.0), |acc, &label| {
            acc.add(emotion_color(label).scale(weights[label.index()]))
        });
    let dominant = emotion_color(dominant_label(scores));
    average.mix(dominant, DOMINANT_MIX)
}

/// Per-point sprite parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointStyle {
    pub size: f32,
    pub opacity: f32,
}

/// Sprite size and opacity for a distortion magnitude
pub fn point_style(magnitude: f32) -> PointStyle {
    let m = magnitude.clamp(0.0, 1.0);
    PointStyle {
        size: 9.0 * (1.0 + 0.8 * m),
        opacity: 0.7 + 0.1 * m,
    }
}

/// Extra brightness for a point `distance` from the origin
pub fn core_glow(distance: f32, glow: f32) -> f32 {
    if distance >= CORE_RADIUS {
        return 0.0;
    }
    (1.0 - distance / CORE_RADIUS).powf(1.5) * glow
}
