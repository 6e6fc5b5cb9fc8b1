//! Core framework components
//!
//! - `error`: structured engine errors and context helpers

pub mod error;

pub use error::{AudioOperation, EngineError, Result, ResultExt};
