//! Engine
//!
//! Wires the timeline, the particle field and the audio layer into one
//! single-threaded context driven by the host's monotonic clock.
//!
//! # Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Host                              │
//! │        start / stop / set_style / update(now)            │
//! ├──────────────────────────────────────────────────────────┤
//! │                       Engine                             │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │                TimelineDriver                      │  │
//! │  │   segment, dominant, run length (single writer)    │  │
//! │  └───────────────┬───────────────────┬────────────────┘  │
//! │            on_tick│                   │on_tick            │
//! │  ┌────────────────▼───┐   ┌───────────▼────────────────┐  │
//! │  │       Field        │   │        AudioLayer          │  │
//! │  │ lattice + edges    │   │ pad / lead / percussion    │  │
//! │  └────────┬───────────┘   └───────────┬────────────────┘  │
//! │           │ FieldFrame                │ AudioCommand      │
//! ├───────────▼───────────────────────────▼──────────────────┤
//! │      Renderer (external)      SynthesisGraph             │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod context;

pub use context::{Engine, StartReport, UpdateReport};
