//! Configuration error type.

use std::path::PathBuf;

/// Errors raised while loading or validating a configuration.
///
/// All of these are fatal and abort startup before any stream runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File extension is not one we can parse
    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error parsing JSON
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Top-level structure is wrong
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A stream-level key is missing or invalid
    #[error("Stream '{stream}': {message}")]
    InvalidStream { stream: String, message: String },

    /// A schema field is invalid
    #[error("Stream '{stream}', field '{field}': {message}")]
    InvalidField {
        stream: String,
        field: String,
        message: String,
    },

    /// An output entry is invalid
    #[error("Stream '{stream}', output {index}: {message}")]
    InvalidOutput {
        stream: String,
        index: usize,
        message: String,
    },

    /// An optional capability was requested but is not available in this build
    #[error("Stream '{stream}': {capability} is unavailable: {reason}")]
    Unavailable {
        stream: String,
        capability: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn stream(stream: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidStream {
            stream: stream.to_string(),
            message: message.into(),
        }
    }

    pub fn field(stream: &str, field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            stream: stream.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn output(stream: &str, index: usize, message: impl Into<String>) -> Self {
        ConfigError::InvalidOutput {
            stream: stream.to_string(),
            index,
            message: message.into(),
        }
    }

    pub fn unavailable(
        stream: &str,
        capability: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::Unavailable {
            stream: stream.to_string(),
            capability: capability.into(),
            reason: reason.into(),
        }
    }
}
