#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for pkauth.
//!
//! # Usage
//!
//! ```rust,no_run
//! use pkauth_config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("policy file: {}", config.store.path.display());
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`PKAUTH_POLICY_PATH`, `PKAUTH_CONCURRENCY`,
//!    `PKAUTH_CATALOG_PATH`, `PKAUTH_LOG_LEVEL`)
//! 2. **Explicit file** (`pkauth --config <path>`)
//! 3. **System** (`/etc/pkauth/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate does not depend on the other pkauth crates. The CLI converts
//! a loaded [`Config`] into stores and catalogs.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layer merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(explicit)
    }

    /// Load configuration from a single file over the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
