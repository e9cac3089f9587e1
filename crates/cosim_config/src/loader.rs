//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::CosimConfig;
use std::path::Path;

/// File name looked up by [`discover_config`].
pub const CONFIG_FILE_NAME: &str = "cosim.toml";

/// Loads a configuration file at an explicit path.
pub fn load_config(path: &Path) -> Result<CosimConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Loads `<dir>/cosim.toml` if it exists, otherwise returns the defaults.
pub fn discover_config(dir: &Path) -> Result<CosimConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.is_file() {
        load_config(&path)
    } else {
        Ok(CosimConfig::default())
    }
}

/// Parses a configuration from a string.
///
/// Only the schema is checked here. Value ranges are checked by
/// [`resolve_settings`](crate::resolve_settings) once command-line overrides
/// have been applied, so a flag can replace a bad file value.
pub fn load_config_from_str(content: &str) -> Result<CosimConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}
