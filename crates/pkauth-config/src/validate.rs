//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Backends a configuration may name. The in-memory store keeps nothing
/// across processes, so it is only constructed in code.
const BACKENDS: [&str; 1] = ["file"];
const CONCURRENCY_MODES: [&str; 2] = ["lock", "optimistic"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];
const LOG_TARGETS: [&str; 3] = ["stderr", "stdout", "file"];
const LOG_ROTATIONS: [&str; 2] = ["never", "daily"];

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_store(config)?;
    validate_catalog(config)?;
    validate_logging(config)?;
    Ok(())
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> ConfigResult<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        field: field.to_owned(),
        message: format!(
            "unsupported value '{value}'; expected one of: {}",
            allowed.join(", ")
        ),
    })
}

fn validate_store(config: &Config) -> ConfigResult<()> {
    let store = &config.store;
    one_of("store.backend", &store.backend, &BACKENDS)?;
    one_of("store.concurrency", &store.concurrency, &CONCURRENCY_MODES)?;

    if store.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "store.path".to_owned(),
            message: "a policy file path is required".to_owned(),
        });
    }
    Ok(())
}

fn validate_catalog(config: &Config) -> ConfigResult<()> {
    if let Some(path) = &config.catalog.path
        && path.as_os_str().is_empty()
    {
        return Err(ConfigError::ValidationError {
            field: "catalog.path".to_owned(),
            message: "catalog path must not be empty; omit it to disable the catalog"
                .to_owned(),
        });
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;
    one_of("logging.level", &logging.level, &LOG_LEVELS)?;
    one_of("logging.format", &logging.format, &LOG_FORMATS)?;
    one_of("logging.target", &logging.target, &LOG_TARGETS)?;
    one_of("logging.rotation", &logging.rotation, &LOG_ROTATIONS)?;

    let has_directory = logging
        .directory
        .as_ref()
        .is_some_and(|d| !d.as_os_str().is_empty());
    if logging.target == "file" && !has_directory {
        return Err(ConfigError::ValidationError {
            field: "logging.directory".to_owned(),
            message: "file logging needs a log directory".to_owned(),
        });
    }

    if logging.directives.iter().any(|d| d.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "logging.directives".to_owned(),
            message: "directives must not be blank".to_owned(),
        });
    }
    Ok(())
}
