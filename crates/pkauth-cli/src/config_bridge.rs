//! Bridge from `pkauth_config::Config` to domain types.

use std::path::Path;
use std::sync::Arc;

use pkauth_authority::Authority;
use pkauth_config::Config;
use pkauth_core::{
    ActionCatalog, IdentityResolver, StaticActionCatalog, SystemIdentityResolver,
    TomlActionCatalog,
};
use pkauth_store::{ConcurrencyControl, FilePolicyStore, PolicyStore};
use pkauth_telemetry::{FileRotation, LogConfig, LogFormat, LogTarget};

/// Prefix of log files written under `logging.directory`.
const LOG_FILE_PREFIX: &str = "pkauth.log";

/// Convert the `[logging]` section to a [`LogConfig`].
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = match cfg.logging.format.as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        _ => LogFormat::Compact,
    };

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);

    log_config = match (cfg.logging.target.as_str(), &cfg.logging.directory) {
        ("file", Some(directory)) => {
            let rotation = match cfg.logging.rotation.as_str() {
                "daily" => FileRotation::Daily,
                _ => FileRotation::Never,
            };
            log_config.with_file_logging(directory, LOG_FILE_PREFIX, rotation)
        },
        ("stdout", _) => log_config.with_target(LogTarget::Stdout),
        _ => log_config.with_target(LogTarget::Stderr),
    };

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    log_config
}

/// Convert `store.concurrency` to a [`ConcurrencyControl`].
pub fn to_concurrency(cfg: &Config) -> ConcurrencyControl {
    match cfg.store.concurrency.as_str() {
        "optimistic" => ConcurrencyControl::Optimistic,
        _ => ConcurrencyControl::Lock,
    }
}

/// Build the file-backed policy store described by the `[store]` section.
pub fn to_policy_store(
    cfg: &Config,
    identities: Arc<dyn IdentityResolver>,
) -> Arc<dyn PolicyStore> {
    Arc::new(
        FilePolicyStore::new(&cfg.store.path, identities).with_concurrency(to_concurrency(cfg)),
    )
}

/// Build the action catalog named by the `[catalog]` section.
pub fn to_action_catalog(cfg: &Config) -> Arc<dyn ActionCatalog> {
    match &cfg.catalog.path {
        Some(path) => Arc::new(TomlActionCatalog::new(path)),
        None => Arc::new(StaticActionCatalog::empty()),
    }
}

/// Wire an [`Authority`] over the system user database.
pub fn to_authority(cfg: &Config) -> Authority {
    with_identities(cfg, Arc::new(SystemIdentityResolver::new()))
}

/// Wire an [`Authority`] over the given identity resolver.
pub fn with_identities(cfg: &Config, identities: Arc<dyn IdentityResolver>) -> Authority {
    let store = to_policy_store(cfg, Arc::clone(&identities));
    Authority::new(store, identities, to_action_catalog(cfg))
}

/// Apply the `--policy` flag on top of the loaded configuration.
pub fn override_policy_path(cfg: &mut Config, path: &Path) {
    path.clone_into(&mut cfg.store.path);
}
