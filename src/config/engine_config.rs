//! Engine configuration
//!
//! Every tunable the engine consumes lives here. Sections default
//! individually, so a file only needs to name what it overrides:
//!
//! ```yaml
//! timeline:
//!   tick_interval_ms: 1500
//! audio:
//!   style: synthwave
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::styles::ToneStyle;
use crate::core::error::{EngineError, Result, ResultExt};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeline cadence
    #[serde(default)]
    pub timeline: TimelineConfig,
    /// Lattice and animation tunables
    #[serde(default)]
    pub field: FieldConfig,
    /// Audio layer settings
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Timeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Period between segment advances
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_tick_interval_ms() -> u64 {
    1800
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl TimelineConfig {
    /// Tick period as a Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Lattice and animation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Points per lattice axis
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,
    /// Distance between neighbouring lattice points
    #[serde(default = "default_spacing")]
    pub spacing: f32,
    /// Scale applied to the wireframe edge points
    #[serde(default = "default_edge_spacing")]
    pub edge_spacing: f32,
    /// Exponential smoothing factor toward the target position
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    /// Displacement that maps to a magnitude of 1.0
    #[serde(default = "default_magnitude_norm")]
    pub magnitude_norm: f32,
    /// Frame-clock units per second of wall time
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    /// Slice-rotation phase units per second of wall time
    #[serde(default = "default_slice_phase_rate")]
    pub slice_phase_rate: f32,
}

fn default_grid_size() -> usize {
    10
}

fn default_spacing() -> f32 {
    1.6
}

fn default_edge_spacing() -> f32 {
    1.07
}

fn default_smoothing() -> f32 {
    0.04
}

fn default_magnitude_norm() -> f32 {
    10.0
}

fn default_frame_rate() -> f32 {
    50.0
}

fn default_slice_phase_rate() -> f32 {
    60.0
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            spacing: default_spacing(),
            edge_spacing: default_edge_spacing(),
            smoothing: default_smoothing(),
            magnitude_norm: default_magnitude_norm(),
            frame_rate: default_frame_rate(),
            slice_phase_rate: default_slice_phase_rate(),
        }
    }
}

impl FieldConfig {
    /// Distance from the origin to the outermost lattice layer
    pub fn half_extent(&self) -> f32 {
        (self.grid_size.saturating_sub(1)) as f32 / 2.0 * self.spacing
    }
}

/// Audio layer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Timbre preset
    #[serde(default)]
    pub style: ToneStyle,
    /// Master volume in [0, 1]
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Transport tempo
    #[serde(default = "default_bpm")]
    pub bpm: f32,
    /// Output sample rate for rendered audio
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_volume() -> f32 {
    0.5
}

fn default_bpm() -> f32 {
    40.0
}

fn default_sample_rate() -> u32 {
    44_100
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            style: ToneStyle::default(),
            volume: default_volume(),
            bpm: default_bpm(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML or JSON file (by extension)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
            message: format!("Failed to read config file: {}", e),
            path: Some(path.to_path_buf()),
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config: Self = if is_json {
            serde_json::from_str(&content).map_err(|e| EngineError::Config {
                message: format!("Failed to parse config JSON: {}", e),
                path: Some(path.to_path_buf()),
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| EngineError::Config {
                message: format!("Failed to parse config YAML: {}", e),
                path: Some(path.to_path_buf()),
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration as YAML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content).map_err(|e| EngineError::Io {
            message: format!("Failed to write config file: {}", e),
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.timeline.tick_interval_ms == 0 {
            return Err(EngineError::config("timeline.tick_interval_ms must be positive"));
        }
        if self.field.grid_size < 2 {
            return Err(EngineError::config("field.grid_size must be at least 2"));
        }
        if !(self.field.smoothing > 0.0 && self.field.smoothing <= 1.0) {
            return Err(EngineError::config("field.smoothing must be in (0, 1]"));
        }
        if !(self.field.magnitude_norm > 0.0) {
            return Err(EngineError::config("field.magnitude_norm must be positive"));
        }
        if !(self.field.spacing > 0.0) || !(self.field.edge_spacing > 0.0) {
            return Err(EngineError::config("field spacing values must be positive"));
        }
        if !(self.field.frame_rate > 0.0) {
            return Err(EngineError::config("field.frame_rate must be positive"));
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(EngineError::config("audio.volume must be in [0, 1]"));
        }
        if !(self.audio.bpm > 0.0) {
            return Err(EngineError::config("audio.bpm must be positive"));
        }
        if self.audio.sample_rate == 0 {
            return Err(EngineError::config("audio.sample_rate must be positive"));
        }
        Ok(())
    }
}

/// Engine configuration builder
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Start from defaults
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Set tick period
    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.timeline.tick_interval_ms = ms;
        self
    }

    /// Set lattice points per axis
    pub fn grid_size(mut self, size: usize) -> Self {
        self.config.field.grid_size = size;
        self
    }

    /// Set smoothing factor
    pub fn smoothing(mut self, alpha: f32) -> Self {
        self.config.field.smoothing = alpha;
        self
    }

    /// Set timbre style
    pub fn style(mut self, style: ToneStyle) -> Self {
        self.config.audio.style = style;
        self
    }

    /// Set master volume
    pub fn volume(mut self, volume: f32) -> Self {
        self.config.audio.volume = volume;
        self
    }

    /// Set output sample rate
    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.config.audio.sample_rate = rate;
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeline.tick_interval(), Duration::from_millis(1800));
        assert!((config.field.half_extent() - 7.2).abs() < 1e-5);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "timeline:\n  tick_interval_ms: 1200\naudio:\n  style: synthwave\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timeline.tick_interval_ms, 1200);
        assert_eq!(config.audio.style, ToneStyle::Synthwave);
        assert_eq!(config.field.grid_size, 10);
        assert!((config.audio.volume - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_builder_validates() {
        let config = EngineConfigBuilder::new()
            .tick_interval_ms(900)
            .style(ToneStyle::Ambient)
            .build()
            .unwrap();
        assert_eq!(config.timeline.tick_interval_ms, 900);

        assert!(EngineConfigBuilder::new().smoothing(0.0).build().is_err());
        assert!(EngineConfigBuilder::new().volume(1.5).build().is_err());
        assert!(EngineConfigBuilder::new().tick_interval_ms(0).build().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join("emoscape_config_test.yaml");
        let config = EngineConfigBuilder::new().grid_size(8).build().unwrap();
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_file(&path).ok();
    }
}
