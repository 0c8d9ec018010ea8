//! CLI command implementations.
//!
//! Commands write their output to a caller-supplied writer so they can be
//! exercised without a terminal.

pub mod export;
pub mod info;
pub mod maintenance;
pub mod secrets;

use anyhow::Context;
use envkeep_core::Config;
use envkeep_secrets::Vault;
use tracing::debug;

/// Open the store described by `config` and load the caller's view.
pub async fn open(config: &Config) -> anyhow::Result<Vault> {
    debug!(project = %config.project, driver = %config.driver, "opening secret store");
    let mut vault = Vault::open(config)
        .await
        .context("Failed to open secret store")?;
    vault
        .load()
        .await
        .context("Failed to load environment variables")?;
    debug!(variables = vault.entries().len(), "environment loaded");
    Ok(vault)
}
