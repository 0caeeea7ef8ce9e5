//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::CacheConfig;
use std::path::Path;

/// Name of the configuration file within a project directory.
pub const CONFIG_FILE: &str = "prism.toml";

/// Loads and validates a `prism.toml` configuration from a directory.
pub fn load_config(dir: &Path) -> Result<CacheConfig, ConfigError> {
    let content = std::fs::read_to_string(dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `prism.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<CacheConfig, ConfigError> {
    let config: CacheConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.persistent.enabled && config.persistent.directory.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "persistent.directory must be set when the persistent tier is enabled".to_string(),
        ));
    }
    if config.persistent.segment_version == 0 {
        return Err(ConfigError::ValidationError(
            "persistent.segment_version must be at least 1".to_string(),
        ));
    }
    Ok(())
}
