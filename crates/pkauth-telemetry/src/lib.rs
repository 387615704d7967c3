//! pkauth Telemetry - logging setup for the pkauth tools.
//!
//! # Example
//!
//! ```rust,no_run
//! use pkauth_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), pkauth_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("pkauth_store=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
