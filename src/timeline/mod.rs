//! Emotion timeline
//!
//! - [`TickSchedule`]: single-slot fixed-period timer over a monotonic clock
//! - [`TimelineDriver`]: segment walker tracking dominant emotion and run length

pub mod driver;
pub mod schedule;

pub use driver::{TimelineDriver, TimelineListener, TimelineState};
pub use schedule::{TickSchedule, MAX_CATCH_UP};
