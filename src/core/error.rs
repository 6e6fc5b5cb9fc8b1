//! Structured error handling for the emoscape engine
//!
//! Provides a hierarchical error type with enough context to tell a
//! configuration mistake apart from a refused audio device.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias with EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for the engine
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Timeline errors (empty speech, playback not started)
    #[error("Timeline error: {message}")]
    Timeline {
        message: String,
        speech: Option<String>,
    },

    /// Audio layer errors
    #[error("Audio error ({operation}): {message}")]
    Audio {
        message: String,
        operation: AudioOperation,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Serialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Internal/bug errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        location: Option<String>,
    },
}

impl EngineError {
    /// Shorthand for a configuration error without a path
    pub fn config(message: impl Into<String>) -> Self {
        EngineError::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Shorthand for an audio error
    pub fn audio(operation: AudioOperation, message: impl Into<String>) -> Self {
        EngineError::Audio {
            message: message.into(),
            operation,
        }
    }

    /// Whether the visual field can keep running after this error
    pub fn is_audio(&self) -> bool {
        matches!(self, EngineError::Audio { .. })
    }
}

/// Audio operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOperation {
    Initialization,
    Saving,
    Playback,
}

impl fmt::Display for AudioOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioOperation::Initialization => write!(f, "initialization"),
            AudioOperation::Saving => write!(f, "saving"),
            AudioOperation::Playback => write!(f, "playback"),
        }
    }
}

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add a simple message context
    fn context(self, msg: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| EngineError::Internal {
            message: format!("{}: {}", f(), e),
            location: None,
        })
    }

    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| EngineError::Internal {
            message: format!("{}: {}", msg.into(), e),
            location: None,
        })
    }
}

/// Convert from anyhow::Error
impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Internal {
            message: err.to_string(),
            location: None,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization {
            message: format!("JSON: {}", err),
        }
    }
}

impl From<serde_yaml::Error> for EngineError {
    fn from(err: serde_yaml::Error) -> Self {
        EngineError::Serialization {
            message: format!("YAML: {}", err),
        }
    }
}

impl From<hound::Error> for EngineError {
    fn from(err: hound::Error) -> Self {
        EngineError::Audio {
            message: err.to_string(),
            operation: AudioOperation::Saving,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::Config {
            message: "tick interval must be positive".to_string(),
            path: Some(PathBuf::from("engine.yaml")),
        };
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("tick interval"));
    }

    #[test]
    fn test_audio_operation_display() {
        let err = EngineError::audio(AudioOperation::Initialization, "device refused");
        assert_eq!(
            err.to_string(),
            "Audio error (initialization): device refused"
        );
        assert!(err.is_audio());
        assert!(!EngineError::config("x").is_audio());
    }

    #[test]
    fn test_result_ext_context() {
        let io: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = io.context("reading speeches").unwrap_err();
        assert!(err.to_string().contains("reading speeches: missing"));
    }
}
