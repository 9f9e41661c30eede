//! Core error types for pomodoromono-core.
//!
//! Nothing in the timer core is fatal. These errors cover configuration
//! I/O, rejected duration input, and calls made after a session was torn down.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomodoromono-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The session actor has shut down and no longer accepts commands
    #[error("Focus session is closed")]
    SessionClosed,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Rejected duration input.
///
/// Rejection never changes timer state; the caller keeps whatever was
/// committed before.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Input had more digits than the buffer holds
    #[error("Duration input '{input}' exceeds {max} digits")]
    TooLong { input: String, max: usize },

    /// Submitted with nothing in the buffer
    #[error("Duration input is empty")]
    Empty,

    /// Buffer content did not parse as a number
    #[error("Duration input '{0}' is not a number")]
    NotANumber(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        CoreError::Config(err.into())
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::Config(ConfigError::ParseFailed(err.to_string()))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
