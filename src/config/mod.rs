//! Configuration types for the engine

pub mod engine_config;

pub use engine_config::{AudioConfig, EngineConfig, EngineConfigBuilder, FieldConfig, TimelineConfig};
