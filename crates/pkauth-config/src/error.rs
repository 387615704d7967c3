//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A config file (or the merged tree) is not valid TOML for [`Config`](crate::Config).
    #[error("failed to parse config {path}: {source}")]
    ParseError {
        /// File that failed, or a `<...>` marker for in-memory layers.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A value is out of range or inconsistent.
    #[error("invalid config value for {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
