//! Configuration schema definitions.

use crate::error::ConfigError;
use crate::secret::SecretString;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Project name reserved for the global scope.
pub const GLOBAL_PROJECT: &str = "*";

/// Persistence engine behind the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendDriver {
    /// Embedded single-file engine.
    #[default]
    #[serde(alias = "sqlite3")]
    Sqlite,
    /// Client/server engine.
    #[serde(alias = "pgx", alias = "postgresql")]
    Postgres,
}

impl BackendDriver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for BackendDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendDriver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pgx" => Ok(Self::Postgres),
            other => Err(ConfigError::UnknownDriver(other.to_string())),
        }
    }
}

/// Caller context supplied before any store operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Project the caller is scoped to; `"*"` means the global scope.
    #[serde(default = "default_project")]
    pub project: String,

    /// Backend engine.
    #[serde(default)]
    pub driver: BackendDriver,

    /// Connection string or database path. Falls back to
    /// `~/.envkeep/envkeep.db` for the embedded engine.
    #[serde(default)]
    pub connection_string: Option<String>,

    /// 32-byte encryption key, hex-encoded.
    #[serde(default)]
    pub encryption_key: Option<SecretString>,

    /// Verbose diagnostics.
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: default_project(),
            driver: BackendDriver::default(),
            connection_string: None,
            encryption_key: None,
            debug: false,
        }
    }
}

fn default_project() -> String {
    GLOBAL_PROJECT.to_string()
}
