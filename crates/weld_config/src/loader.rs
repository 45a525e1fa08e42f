//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::WeldConfig;
use std::collections::HashSet;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE: &str = "weld.toml";

/// Loads and validates `weld.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<WeldConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `weld.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<WeldConfig, ConfigError> {
    let config: WeldConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks required fields, resource layouts, and resource uniqueness.
fn validate_config(config: &WeldConfig) -> Result<(), ConfigError> {
    if config.bridge.name.is_empty() {
        return Err(ConfigError::MissingField("bridge.name".to_string()));
    }
    if config.bridge.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("bridge.output_dir".to_string()));
    }
    let mut seen = HashSet::new();
    for resource in &config.resources {
        if resource.name.is_empty() {
            return Err(ConfigError::MissingField("resource.name".to_string()));
        }
        if !seen.insert((resource.name.as_str(), resource.index)) {
            return Err(ConfigError::ValidationError(format!(
                "resource '{}' is defined more than once",
                resource.logical_name()
            )));
        }
        resource.layout()?;
    }
    Ok(())
}
