//! Configuration error types for the config module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The environment variable naming a channel's device is unset.
    /// Detected at open time, never at load time.
    #[error("Environment variable is not defined: {var} (device for channel '{channel}')")]
    MissingEnv { var: String, channel: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
