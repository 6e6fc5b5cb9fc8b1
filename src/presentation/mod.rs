//! Presentation adapter
//!
//! Maps field state and emotion weights to what a renderer draws:
//! blended color, glow, per-point sprite size and opacity.

pub mod frame;
pub mod palette;

pub use frame::{FieldFrame, PointBuffer};
pub use palette::{
    color_blend, core_glow, emotion_color, glow_intensity, point_style, PointStyle, Rgb,
    DOMINANT_MIX,
};
