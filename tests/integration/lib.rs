//! Shared fixtures for envkeep integration tests.

use std::path::PathBuf;

use envkeep_core::{BackendDriver, Config};
use envkeep_secrets::{EncryptionKey, Vault};
use tempfile::TempDir;

/// A scratch directory holding one SQLite database and its key.
pub struct Workspace {
    pub dir: TempDir,
    pub key: EncryptionKey,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            key: EncryptionKey::generate(),
        }
    }

    pub fn database(&self) -> PathBuf {
        self.dir.path().join("data").join("envkeep.db")
    }

    /// Caller context for `project` over this workspace's database.
    pub fn config(&self, project: &str) -> Config {
        Config {
            project: project.to_string(),
            driver: BackendDriver::Sqlite,
            connection_string: Some(self.database().to_string_lossy().into_owned()),
            encryption_key: Some(self.key.to_hex()),
            debug: false,
        }
    }

    /// Write a JSON5 config file for `project` and return its path.
    pub fn write_config(&self, project: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{project}.json5"));
        let content = format!(
            "{{\n  project: {project:?},\n  driver: \"sqlite\",\n  connection_string: {db:?},\n  encryption_key: {key:?},\n}}\n",
            db = self.database().to_string_lossy(),
            key = self.key.to_hex().expose_secret(),
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Open and load a vault for `project`.
    pub async fn vault(&self, project: &str) -> Vault {
        let mut vault = Vault::open(&self.config(project)).await.unwrap();
        vault.load().await.unwrap();
        vault
    }

    /// Effective value of `key` in a freshly loaded view of `project`.
    pub async fn lookup(&self, project: &str, key: &str) -> Option<String> {
        let vault = self.vault(project).await;
        let value = vault.get(key).map(|v| v.expose_secret().to_string());
        vault.close().await;
        value
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
