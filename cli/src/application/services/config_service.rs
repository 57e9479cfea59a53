//! Application service: configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::{LauncherConfig, apply_config_value};

/// Load configuration.
pub fn load_config(store: &impl ConfigStore) -> Result<LauncherConfig> {
    store.load()
}

/// Validate and persist a single `key = value` setting.
///
/// Nothing is written when the key or value is rejected.
pub fn set_config_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<LauncherConfig> {
    let mut config = store.load()?;
    apply_config_value(&mut config, key, value)?;
    store.save(&config)?;
    tracing::debug!(key, value, "config updated");
    Ok(config)
}
