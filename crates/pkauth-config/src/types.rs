//! Configuration types for pkauth.
//!
//! These types carry no dependency on the other pkauth crates. Values that
//! map onto domain enums (store backend, concurrency mode, log format) stay
//! strings here; they are checked by [`validate`](crate::validate) and
//! converted at the CLI boundary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default location of the policy file.
pub const DEFAULT_POLICY_PATH: &str = "/etc/polkit-1/localauthority/50-local.d/50-pkauth.pkla";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where and how authorization records are stored.
    pub store: StoreSection,
    /// Action metadata source.
    pub catalog: CatalogSection,
    /// Log level and output format.
    pub logging: LoggingSection,
}

/// Policy store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Storage backend. Only `"file"` is accepted.
    pub backend: String,
    /// Policy file path.
    pub path: PathBuf,
    /// `"lock"` (exclusive lock across each update) or `"optimistic"`
    /// (revision check at write time).
    pub concurrency: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: "file".to_owned(),
            path: PathBuf::from(DEFAULT_POLICY_PATH),
            concurrency: "lock".to_owned(),
        }
    }
}

/// Action catalog settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// TOML file listing known actions. `None` means no catalog: listing
    /// returns nothing and describing returns nothing.
    pub path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// `"pretty"`, `"compact"` or `"json"`.
    pub format: String,
    /// `"stderr"`, `"stdout"` or `"file"`.
    pub target: String,
    /// Log directory, required when `target` is `"file"`.
    pub directory: Option<PathBuf>,
    /// File rotation: `"never"` or `"daily"`.
    pub rotation: String,
    /// Extra per-target directives (e.g. `"pkauth_store=debug"`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directory: None,
            rotation: "never".to_owned(),
            directives: Vec::new(),
        }
    }
}
