//! Telemetry error types.

use thiserror::Error;

/// Errors raised while setting up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The logging configuration is invalid (bad level, directive or format).
    #[error("invalid logging configuration: {0}")]
    ConfigError(String),

    /// A global subscriber is already installed or could not be installed.
    #[error("failed to initialize logging: {0}")]
    InitError(String),

    /// The log file target could not be prepared.
    #[error("log target I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
