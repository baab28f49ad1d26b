//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Example configuration written by `tonebank init`
pub const EXAMPLE_CONFIG: &str = include_str!("../../tonebank.example.yaml");

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<TonebankConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {:?}", path))?;
    let config: TonebankConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file: {:?}", path))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration, falling back to the built-in defaults when `path`
/// does not exist
pub fn load_or_default(path: &Path) -> Result<TonebankConfig> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(?path, "config file not found, using defaults");
        Ok(TonebankConfig::default())
    }
}
