//! Procedural particle field
//!
//! - `distortion`: pure per-emotion displacement functions
//! - `lattice`: the point grid, its wireframe and per-frame smoothing
//! - `escalation`: intensity multiplier and slice rotation from run length
//! - `clock`: frame-rate independent animation time

pub mod clock;
pub mod distortion;
pub mod escalation;
pub mod lattice;

pub use clock::FrameClock;
pub use distortion::{displace, displace_with};
pub use escalation::{intensity_for_run, SlicePattern, SliceRotation};
pub use lattice::{
    edge_positions, frame_smoothing, grid_positions, AdvanceParams, Field, FieldStats, LatticePoint, PointSet,
};
