//! Run-length escalation for the visual field
//!
//! Two effects grow with the run length: the intensity multiplier fed to
//! every distortion, and a slice rotation that turns one outer layer of
//! the cube at a time like a puzzle cube.

use glam::{Quat, Vec3};

/// Run length at which both effects start
pub const ESCALATION_START: u32 = 3;

/// Ceiling of the intensity multiplier
pub const MAX_INTENSITY: f32 = 3.0;

/// Depth of the rotating slice measured from the outer face
const SLICE_DEPTH: f32 = 2.5;

/// Phase units per slice pattern
const PATTERN_RATE: f32 = 0.02;

/// Radians per phase unit at full strength
const ANGLE_RATE: f32 = 0.03;

/// Distortion multiplier for a run length: 1 up to the start, then +0.2
/// per extra tick, capped at 3.
pub fn intensity_for_run(run_length: u32) -> f32 {
    if run_length <= ESCALATION_START {
        return 1.0;
    }
    (1.0 + 0.2 * (run_length - ESCALATION_START) as f32).clamp(1.0, MAX_INTENSITY)
}

/// Axis and side of a rotating slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlicePattern {
    Top,
    Bottom,
    Right,
    Left,
    Front,
    Back,
}

impl SlicePattern {
    const CYCLE: [SlicePattern; 6] = [
        SlicePattern::Top,
        SlicePattern::Bottom,
        SlicePattern::Right,
        SlicePattern::Left,
        SlicePattern::Front,
        SlicePattern::Back,
    ];

    /// Pattern active at `phase`
    pub fn at_phase(phase: f32) -> Self {
        let idx = ((phase * PATTERN_RATE).floor().max(0.0) as usize) % Self::CYCLE.len();
        Self::CYCLE[idx]
    }

    fn selects(&self, p: Vec3, threshold: f32) -> bool {
        match self {
            SlicePattern::Top => p.y > threshold,
            SlicePattern::Bottom => p.y < -threshold,
            SlicePattern::Right => p.x > threshold,
            SlicePattern::Left => p.x < -threshold,
            SlicePattern::Front => p.z > threshold,
            SlicePattern::Back => p.z < -threshold,
        }
    }

    fn rotation(&self, angle: f32) -> Quat {
        match self {
            SlicePattern::Top => Quat::from_rotation_y(angle),
            SlicePattern::Bottom => Quat::from_rotation_y(-angle),
            SlicePattern::Right => Quat::from_rotation_x(angle),
            SlicePattern::Left => Quat::from_rotation_x(-angle),
            SlicePattern::Front => Quat::from_rotation_z(angle),
            SlicePattern::Back => Quat::from_rotation_z(-angle),
        }
    }
}

/// Slice rotation for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceRotation {
    pub pattern: SlicePattern,
    threshold: f32,
    rotation: Quat,
}

impl SliceRotation {
    /// Rotation for `run_length` at `phase`, `None` below the start
    pub fn for_run(run_length: u32, phase: f32, half_extent: f32) -> Option<Self> {
        if run_length < ESCALATION_START {
            return None;
        }
        let strength = ((run_length - ESCALATION_START) as f32 / 10.0).min(1.0);
        let pattern = SlicePattern::at_phase(phase);
        let angle = phase * ANGLE_RATE * strength;
        Some(Self {
            pattern,
            threshold: half_extent - SLICE_DEPTH,
            rotation: pattern.rotation(angle),
        })
    }

    /// Rotate `target` when `rest` lies in the active slice
    pub fn apply(&self, rest: Vec3, target: Vec3) -> Vec3 {
        if self.pattern.selects(rest, self.threshold) {
            self.rotation * target
        } else {
            target
        }
    }
}
