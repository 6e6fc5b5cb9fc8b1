//! Per-frame output for an external renderer

use serde::Serialize;

use super::palette::{color_blend, core_glow, glow_intensity, point_style, Rgb};
use crate::emotion::{EmotionLabel, SpeechSegment};
use crate::field::{Field, PointSet};

/// Per-point attributes of one point set, index-aligned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointBuffer {
    pub positions: Vec<[f32; 3]>,
    pub magnitudes: Vec<f32>,
    /// Sprite size, grows with magnitude
    pub sizes: Vec<f32>,
    pub opacities: Vec<f32>,
    /// Extra brightness near the origin, scaled by the frame's glow
    pub core_glow: Vec<f32>,
}

impl PointBuffer {
    pub fn of(set: &PointSet, glow: f32) -> Self {
        let n = set.len();
        let mut buffer = Self {
            positions: Vec::with_capacity(n),
            magnitudes: Vec::with_capacity(n),
            sizes: Vec::with_capacity(n),
            opacities: Vec::with_capacity(n),
            core_glow: Vec::with_capacity(n),
        };
        for point in set.points() {
            let style = point_style(point.magnitude());
            buffer.positions.push(point.current().to_array());
            buffer.magnitudes.push(point.magnitude());
            buffer.sizes.push(style.size);
            buffer.opacities.push(style.opacity);
            buffer.core_glow.push(core_glow(point.current().length(), glow));
        }
        buffer
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Everything a renderer needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFrame {
    /// Animation clock the frame was computed at
    pub time: f32,
    pub dominant: EmotionLabel,
    pub run_length: u32,
    pub color: Rgb,
    pub glow: f32,
    pub lattice: PointBuffer,
    pub edges: PointBuffer,
}

impl FieldFrame {
    /// Capture `field`, colored by `segment` when one is playing
    pub fn capture(field: &Field, segment: Option<&SpeechSegment>) -> Self {
        let dominant = field.label();
        let glow = glow_intensity(dominant);
        let color = match segment {
            Some(segment) => color_blend(&segment.scores),
            None => Rgb::WHITE,
        };
        Self {
            time: field.clock().time(),
            dominant,
            run_length: field.run_length(),
            color,
            glow,
            lattice: PointBuffer::of(field.lattice(), glow),
            edges: PointBuffer::of(field.edges(), glow),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use crate::presentation::palette::emotion_color;

    #[test]
    fn test_capture_shapes() {
        let mut field = Field::with_seed(&FieldConfig::default(), 0);
        field.set_emotion(EmotionLabel::Joy, 2);
        let segment = SpeechSegment::single("hi", EmotionLabel::Joy);
        let frame = FieldFrame::capture(&field, Some(&segment));

        assert_eq!(frame.lattice.len(), 1000);
        assert_eq!(frame.edges.len(), 120);
        assert_eq!(frame.lattice.magnitudes.len(), 1000);
        assert_eq!(frame.glow, 0.9);
        assert!(frame.color.distance(emotion_color(EmotionLabel::Joy)) < 1e-5);
    }

    #[test]
    fn test_points_carry_sprite_style_and_core_glow() {
        let mut field = Field::with_seed(&FieldConfig::default(), 0);
        field.set_emotion(EmotionLabel::Neutral, 1);
        for i in 0..=30u64 {
            field.advance_frame(std::time::Duration::from_millis(i * 16));
        }
        let frame = FieldFrame::capture(&field, None);
        let lattice = &frame.lattice;
        assert_eq!(lattice.sizes.len(), lattice.len());
        assert_eq!(lattice.opacities.len(), lattice.len());
        assert_eq!(lattice.core_glow.len(), lattice.len());

        for i in 0..lattice.len() {
            let style = point_style(lattice.magnitudes[i]);
            assert_eq!(lattice.sizes[i], style.size);
            assert_eq!(lattice.opacities[i], style.opacity);
            assert!(lattice.core_glow[i] >= 0.0 && lattice.core_glow[i] <= frame.glow);
        }
        // the innermost points glow, the corners do not
        assert!(lattice.core_glow.iter().any(|&g| g > 0.0));
        assert!(lattice.core_glow.iter().any(|&g| g == 0.0));
    }

    #[test]
    fn test_idle_frame_is_white() {
        let field = Field::with_seed(&FieldConfig::default(), 0);
        let frame = FieldFrame::capture(&field, None);
        assert_eq!(frame.color, Rgb::WHITE);
        assert_eq!(frame.dominant, EmotionLabel::Neutral);
    }

    #[test]
    fn test_serializes_to_json() {
        let field = Field::with_seed(&FieldConfig::default(), 0);
        let json = serde_json::to_string(&FieldFrame::capture(&field, None)).unwrap();
        assert!(json.contains("\"dominant\":\"neutral\""));
    }
}
