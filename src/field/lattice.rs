//! Lattice and field state
//!
//! The field owns two point sets generated once and never resized: a solid
//! N x N x N grid and the 12 wireframe edges of the cube. Every frame each
//! point's target is derived from its rest position, never from where it
//! currently is, and the current position eases toward it. The configured
//! smoothing factor is the per-frame step at 60 fps; other frame lengths
//! get the equivalent step, so convergence does not depend on frame rate.

use std::time::Duration;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::clock::FrameClock;
use super::distortion::displace_with;
use super::escalation::{intensity_for_run, SliceRotation};
use crate::config::FieldConfig;
use crate::emotion::{EmotionLabel, SpeechSegment};
use crate::timeline::{TimelineListener, TimelineState};

/// One animated point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticePoint {
    rest: Vec3,
    current: Vec3,
    target: Vec3,
    magnitude: f32,
}

impl LatticePoint {
    pub fn new(rest: Vec3) -> Self {
        Self {
            rest,
            current: rest,
            target: rest,
            magnitude: 0.0,
        }
    }

    pub fn rest(&self) -> Vec3 {
        self.rest
    }

    pub fn current(&self) -> Vec3 {
        self.current
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Normalized displacement in [0, 1]
    pub fn magnitude(&self) -> f32 {
        self.magnitude
    }
}

/// Frame rate at which the configured smoothing factor applies as-is
pub const SMOOTHING_REFERENCE_FPS: f32 = 60.0;

/// Smoothing step for a frame of length `delta`.
///
/// Two half-length frames ease exactly as far as one full frame.
pub fn frame_smoothing(alpha: f32, delta: Duration) -> f32 {
    let frames = delta.as_secs_f32() * SMOOTHING_REFERENCE_FPS;
    1.0 - (1.0 - alpha.clamp(0.0, 1.0)).powf(frames)
}

/// Parameters shared by every point in one advance
#[derive(Debug, Clone, Copy)]
pub struct AdvanceParams {
    pub label: EmotionLabel,
    pub time: f32,
    pub intensity: f32,
    pub smoothing: f32,
    pub magnitude_norm: f32,
    /// Distance from the origin to the lattice's outer layer
    pub half_extent: f32,
}

/// A fixed collection of points
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    points: Vec<LatticePoint>,
}

impl PointSet {
    pub fn from_rest(positions: impl IntoIterator<Item = Vec3>) -> Self {
        Self {
            points: positions.into_iter().map(LatticePoint::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[LatticePoint] {
        &self.points
    }

    /// Current positions as plain arrays for a renderer
    pub fn positions(&self) -> Vec<[f32; 3]> {
        self.points.iter().map(|p| p.current.to_array()).collect()
    }

    pub fn magnitudes(&self) -> Vec<f32> {
        self.points.iter().map(|p| p.magnitude).collect()
    }

    /// Move every point one smoothing step toward its displaced rest position
    pub fn advance<R: Rng + ?Sized>(&mut self, params: &AdvanceParams, slice: Option<&SliceRotation>, rng: &mut R) {
        for point in &mut self.points {
            let mut target = displace_with(
                params.label,
                point.rest,
                params.time,
                params.intensity,
                params.half_extent,
                rng,
            );
            if let Some(slice) = slice {
                target = slice.apply(point.rest, target);
            }
            point.target = target;
            point.current += (target - point.current) * params.smoothing;
            point.magnitude = (point.current.distance(point.rest) / params.magnitude_norm).min(1.0);
        }
    }
}

/// Rest positions of an `n`^3 grid centred on the origin, x varying fastest
pub fn grid_positions(n: usize, spacing: f32) -> Vec<Vec3> {
    let offset = n as f32 / 2.0 - 0.5;
    let coord = |i: usize| (i as f32 - offset) * spacing;
    (0..n * n * n)
        .map(|i| Vec3::new(coord(i % n), coord((i / n) % n), coord(i / (n * n))))
        .collect()
}

/// Rest positions along the 12 cube edges, `n` points per edge
pub fn edge_positions(n: usize, spacing: f32) -> Vec<Vec3> {
    let h = (n.saturating_sub(1)) as f32 / 2.0;
    let corners: [(Vec3, Vec3); 12] = [
        // bottom face
        (Vec3::new(-h, -h, -h), Vec3::new(h, -h, -h)),
        (Vec3::new(h, -h, -h), Vec3::new(h, -h, h)),
        (Vec3::new(h, -h, h), Vec3::new(-h, -h, h)),
        (Vec3::new(-h, -h, h), Vec3::new(-h, -h, -h)),
        // top face
        (Vec3::new(-h, h, -h), Vec3::new(h, h, -h)),
        (Vec3::new(h, h, -h), Vec3::new(h, h, h)),
        (Vec3::new(h, h, h), Vec3::new(-h, h, h)),
        (Vec3::new(-h, h, h), Vec3::new(-h, h, -h)),
        // verticals
        (Vec3::new(-h, -h, -h), Vec3::new(-h, h, -h)),
        (Vec3::new(h, -h, -h), Vec3::new(h, h, -h)),
        (Vec3::new(h, -h, h), Vec3::new(h, h, h)),
        (Vec3::new(-h, -h, h), Vec3::new(-h, h, h)),
    ];

    let steps = n.max(2);
    corners
        .iter()
        .flat_map(|&(start, end)| {
            (0..steps).map(move |i| {
                let t = i as f32 / (steps - 1) as f32;
                start.lerp(end, t) * spacing
            })
        })
        .collect()
}

/// The animated lattice plus its wireframe
pub struct Field {
    config: FieldConfig,
    lattice: PointSet,
    edges: PointSet,
    clock: FrameClock,
    label: EmotionLabel,
    run_length: u32,
    rng: StdRng,
}

impl Field {
    /// Field whose fear jitter is seeded from the OS
    pub fn new(config: &FieldConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Field with reproducible fear jitter
    pub fn with_seed(config: &FieldConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &FieldConfig, rng: StdRng) -> Self {
        Self {
            config: config.clone(),
            lattice: PointSet::from_rest(grid_positions(config.grid_size, config.spacing)),
            edges: PointSet::from_rest(edge_positions(config.grid_size, config.edge_spacing)),
            clock: FrameClock::new(config.frame_rate, config.slice_phase_rate),
            label: EmotionLabel::Neutral,
            run_length: 0,
            rng,
        }
    }

    /// Advance both point sets by one reference frame with explicit inputs
    /// and no slice rotation
    pub fn advance(&mut self, label: EmotionLabel, time: f32, intensity: f32) {
        self.advance_with(label, time, intensity, self.config.smoothing, None);
    }

    fn advance_with(
        &mut self,
        label: EmotionLabel,
        time: f32,
        intensity: f32,
        smoothing: f32,
        slice: Option<SliceRotation>,
    ) {
        let params = AdvanceParams {
            label,
            time,
            intensity,
            smoothing,
            magnitude_norm: self.config.magnitude_norm,
            half_extent: self.config.half_extent(),
        };
        self.lattice.advance(&params, slice.as_ref(), &mut self.rng);
        self.edges.advance(&params, slice.as_ref(), &mut self.rng);
    }

    /// Advance one rendered frame at wall time `now`, using the label and
    /// run length from the latest tick.
    pub fn advance_frame(&mut self, now: Duration) {
        let delta = self.clock.advance_to(now);
        self.step_current(delta);
    }

    /// Advance one frame by an explicit delta
    pub fn step(&mut self, delta: Duration) {
        self.clock.advance_by(delta);
        self.step_current(delta);
    }

    fn step_current(&mut self, delta: Duration) {
        let intensity = intensity_for_run(self.run_length);
        let smoothing = frame_smoothing(self.config.smoothing, delta);
        let slice = SliceRotation::for_run(self.run_length, self.clock.slice_phase(), self.config.half_extent());
        self.advance_with(self.label, self.clock.time(), intensity, smoothing, slice);
    }

    /// Set the emotion and run length driving later frames
    pub fn set_emotion(&mut self, label: EmotionLabel, run_length: u32) {
        self.label = label;
        self.run_length = run_length;
    }

    /// Stop measuring frame gaps until the next frame
    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn lattice(&self) -> &PointSet {
        &self.lattice
    }

    pub fn edges(&self) -> &PointSet {
        &self.edges
    }

    pub fn label(&self) -> EmotionLabel {
        self.label
    }

    pub fn run_length(&self) -> u32 {
        self.run_length
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }
}

impl TimelineListener for Field {
    fn on_tick(&mut self, state: &TimelineState, _segment: &SpeechSegment) {
        self.set_emotion(state.dominant, state.run_length);
    }
}

/// Summary statistics of a point set
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FieldStats {
    pub mean_magnitude: f32,
    pub max_magnitude: f32,
    pub max_offset: f32,
}

impl FieldStats {
    pub fn of(set: &PointSet) -> Self {
        if set.is_empty() {
            return Self::default();
        }
        let mut stats = Self::default();
        let mut sum = 0.0;
        for p in set.points() {
            sum += p.magnitude;
            stats.max_magnitude = stats.max_magnitude.max(p.magnitude);
            stats.max_offset = stats.max_offset.max(p.current.distance(p.rest));
        }
        stats.mean_magnitude = sum / set.len() as f32;
        stats
    }
}
