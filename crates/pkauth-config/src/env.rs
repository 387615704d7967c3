//! Environment variable overrides.
//!
//! Environment variables sit above every file layer. A variable that is set
//! but empty is ignored.

use std::collections::HashMap;

use tracing::debug;

/// Environment variables and the dotted config keys they override.
pub const ENV_OVERRIDES: [(&str, &str); 4] = [
    ("PKAUTH_POLICY_PATH", "store.path"),
    ("PKAUTH_CONCURRENCY", "store.concurrency"),
    ("PKAUTH_CATALOG_PATH", "catalog.path"),
    ("PKAUTH_LOG_LEVEL", "logging.level"),
];

/// Snapshot the `PKAUTH_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("PKAUTH_"))
        .collect()
}

/// Write every recognised, non-empty variable from `env_vars` into the
/// merged tree. Returns how many keys were overridden.
pub fn apply_env_overrides(merged: &mut toml::Value, env_vars: &HashMap<String, String>) -> usize {
    let mut applied = 0usize;
    for (var, key) in ENV_OVERRIDES {
        let Some(value) = env_vars.get(var).filter(|v| !v.is_empty()) else {
            continue;
        };
        if set_path(merged, key, toml::Value::String(value.clone())) {
            debug!(var, key, "applied environment override");
            applied = applied.saturating_add(1);
        }
    }
    applied
}

/// Set `dotted` inside `root`, creating intermediate tables as needed.
/// Returns `false` if a non-table value is in the way.
fn set_path(root: &mut toml::Value, dotted: &str, value: toml::Value) -> bool {
    let mut parts: Vec<&str> = dotted.split('.').collect();
    let Some(leaf) = parts.pop() else {
        return false;
    };

    let mut current = root;
    for part in parts {
        let Some(table) = current.as_table_mut() else {
            return false;
        };
        current = table
            .entry(part)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    match current.as_table_mut() {
        Some(table) => {
            table.insert(leaf.to_owned(), value);
            true
        },
        None => false,
    }
}
