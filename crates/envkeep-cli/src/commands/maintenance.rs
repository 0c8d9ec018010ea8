//! Store maintenance: `rotate`, `prune`, `stat`.

use std::io::Write;

use anyhow::Context;
use clap::Args;
use envkeep_core::config::ENCRYPTION_KEY_ENV;
use envkeep_secrets::{EncryptionKey, Vault};

use crate::render;

#[derive(Debug, Args)]
pub struct RotateArgs {
    /// New encryption key, 32 bytes hex-encoded
    #[arg(short, long = "encryption-key")]
    pub encryption_key: String,
}

#[derive(Debug, Args)]
pub struct PruneArgs {
    /// Number of most recent versions to keep
    pub offset: u32,

    /// Include active versions
    #[arg(short, long)]
    pub all: bool,

    /// Prune the global scope instead of the project
    #[arg(short, long)]
    pub global: bool,
}

pub async fn rotate(vault: &mut Vault, args: RotateArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let new_key = EncryptionKey::from_hex(&args.encryption_key).context("Invalid new key")?;

    let rotated = vault
        .rotate(new_key)
        .await
        .context("Key rotation failed; nothing was changed")?;

    render::success(out, &format!("Re-encrypted {rotated} variable(s)"))?;
    render::warning(
        out,
        &format!("Update {ENCRYPTION_KEY_ENV} to the new key before the next run"),
    )?;
    Ok(())
}

/// Delete old versions. Without `--all` only deprecated versions are
/// removed; with it the newest `offset` versions of any state survive.
pub async fn prune(vault: &mut Vault, args: PruneArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let deleted = if args.all {
        vault.clear(args.offset, args.global).await
    } else {
        vault.prune(args.offset, args.global).await
    }
    .context("Prune failed")?;

    render::success(out, &format!("Deleted {} version(s)", deleted.len()))?;
    Ok(())
}

pub async fn stat(vault: &Vault, out: &mut impl Write) -> anyhow::Result<()> {
    let stats = vault.stats().await.context("Failed to read statistics")?;

    let rows: Vec<Vec<String>> = stats
        .iter()
        .map(|s| vec![s.key.clone(), s.project.to_string(), s.versions.to_string()])
        .collect();
    render::table(out, &["Key", "Project", "Versions"], &rows)?;
    Ok(())
}
