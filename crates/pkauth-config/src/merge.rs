//! Layer merging.

/// Merge `overlay` into `base`. Tables merge key by key; any other value in
/// `overlay` replaces the one in `base`.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_table.insert(key.clone(), value.clone());
                    },
                }
            }
        },
        (base, overlay) => *base = overlay.clone(),
    }
}
