//! Configuration loading, environment overrides, and validation.

use super::{BackendDriver, Config};
use crate::env;
use crate::error::ConfigError;
use crate::paths;
use crate::secret::SecretString;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Environment variable naming the caller's project.
pub const PROJECT_ENV: &str = "ENVKEEP_PROJECT";
/// Environment variable naming the backend driver.
pub const DB_DRIVER_ENV: &str = "ENVKEEP_DB_DRIVER";
/// Environment variable holding the connection string.
pub const DB_CONNECTION_STRING_ENV: &str = "ENVKEEP_DB_CONNECTION_STRING";
/// Environment variable holding the hex encryption key.
pub const ENCRYPTION_KEY_ENV: &str = "ENVKEEP_ENCRYPTION_KEY";
/// Environment variable enabling debug output.
pub const DEBUG_ENV: &str = "ENVKEEP_DEBUG";

/// Hex length of a 32-byte key.
const KEY_HEX_LEN: usize = 64;

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Resolve the full caller context.
    ///
    /// An explicit `path` must exist. Without one, `~/.envkeep/config.json5`
    /// is read when present. Environment variables are applied on top.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => {
                let default_path = paths::config_file()?;
                if default_path.exists() {
                    debug!(path = %default_path.display(), "loading config file");
                    Self::load(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(env::get_var)?;
        Ok(config)
    }

    /// Apply `ENVKEEP_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(project) = lookup(PROJECT_ENV) {
            self.project = project;
        }
        if let Some(driver) = lookup(DB_DRIVER_ENV) {
            self.driver = driver.parse()?;
        }
        if let Some(connection_string) = lookup(DB_CONNECTION_STRING_ENV) {
            self.connection_string = Some(connection_string);
        }
        if let Some(key) = lookup(ENCRYPTION_KEY_ENV) {
            self.encryption_key = Some(SecretString::new(key));
        }
        if let Some(flag) = lookup(DEBUG_ENV) {
            self.debug = env::parse_bool(&flag);
        }
        Ok(())
    }

    /// The connection string, defaulting to the embedded database path.
    pub fn connection_string(&self) -> Result<String, ConfigError> {
        match (&self.connection_string, self.driver) {
            (Some(s), _) => Ok(s.clone()),
            (None, BackendDriver::Sqlite) => {
                Ok(paths::default_database()?.to_string_lossy().into_owned())
            }
            (None, BackendDriver::Postgres) => Err(ConfigError::Missing(DB_CONNECTION_STRING_ENV)),
        }
    }

    /// The configured encryption key.
    pub fn encryption_key(&self) -> Result<&SecretString, ConfigError> {
        self.encryption_key
            .as_ref()
            .ok_or(ConfigError::Missing(ENCRYPTION_KEY_ENV))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.project.trim().is_empty() {
            errors.push("Project must not be empty".to_string());
        }

        match &self.encryption_key {
            None => errors.push(format!("{ENCRYPTION_KEY_ENV} is not set")),
            Some(key) => {
                let key = key.expose_secret().trim();
                if key.len() != KEY_HEX_LEN || !key.chars().all(|c| c.is_ascii_hexdigit()) {
                    errors.push(format!(
                        "Encryption key must be {KEY_HEX_LEN} hex characters (32 bytes)"
                    ));
                }
            }
        }

        if self.driver == BackendDriver::Postgres && self.connection_string.is_none() {
            errors.push(format!(
                "Driver 'postgres' requires {DB_CONNECTION_STRING_ENV}"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
