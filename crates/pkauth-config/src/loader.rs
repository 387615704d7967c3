//! Config file discovery and layered loading.
//!
//! Layers, lowest precedence first:
//! 1. Embedded `defaults.toml`
//! 2. `/etc/pkauth/config.toml` (system), skipped if absent
//! 3. An explicitly named file, which must exist
//! 4. `PKAUTH_*` environment overrides
//!
//! The merged tree is deserialized into [`Config`] and validated.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/pkauth/config.toml";

/// Maximum allowed config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load configuration with the full precedence chain.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is unreadable or malformed,
/// if `explicit` does not exist, or if the merged configuration fails
/// validation.
pub fn load(explicit: Option<&Path>) -> ConfigResult<Config> {
    load_layers(
        Path::new(SYSTEM_CONFIG_PATH),
        explicit,
        &collect_env_vars(),
    )
}

/// [`load`] with the system path and environment supplied by the caller.
///
/// # Errors
///
/// Same as [`load`].
pub fn load_layers(
    system_path: &Path,
    explicit: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<Config> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    if let Some(overlay) = try_load_file(system_path)? {
        deep_merge(&mut merged, &overlay);
        info!(path = %system_path.display(), "loaded system config");
    }

    if let Some(path) = explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded config file");
    }

    let env_count = apply_env_overrides(&mut merged, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable overrides");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Load a config from a single file on top of the built-in defaults,
/// without the system layer or the environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    load_layers(&PathBuf::new(), Some(path), &HashMap::new())
}

/// Try to load a file, returning `None` if it doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    if path.as_os_str().is_empty() {
        return Ok(None);
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}
