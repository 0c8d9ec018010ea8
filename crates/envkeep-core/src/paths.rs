//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the envkeep base directory (~/.envkeep).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".envkeep"))
}

/// Get the config file path (~/.envkeep/config.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("config.json5"))
}

/// Get the default embedded database path (~/.envkeep/envkeep.db).
pub fn default_database() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("envkeep.db"))
}
