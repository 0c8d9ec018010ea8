//! Per-variable commands: `set`, `mv`, `rm`, `grep`, `history`.

use std::io::Write;

use anyhow::Context;
use clap::Args;
use envkeep_secrets::{RenameTarget, Vault, VaultError};

use crate::render;

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Variable name
    pub key: String,

    /// Variable value
    pub value: String,

    /// Store the value in the global scope
    #[arg(short, long)]
    pub global: bool,
}

#[derive(Debug, Args)]
pub struct MvArgs {
    /// Current variable or project name
    pub previous: String,

    /// New name
    pub next: String,

    /// Rename a project instead of a variable
    #[arg(short, long, conflicts_with = "global")]
    pub project: bool,

    /// Rename a global variable
    #[arg(short, long)]
    pub global: bool,
}

#[derive(Debug, Args)]
pub struct RmArgs {
    /// Variable name
    pub key: String,

    /// Also delete deprecated versions
    #[arg(short, long)]
    pub all: bool,

    /// Also delete the global variable
    #[arg(short, long)]
    pub global: bool,
}

#[derive(Debug, Args)]
pub struct GrepArgs {
    /// Variable name
    pub key: String,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Variable name
    pub key: String,

    /// Include deprecated versions
    #[arg(short, long)]
    pub all: bool,

    /// Show the global variable's versions
    #[arg(short, long)]
    pub global: bool,
}

pub async fn set(vault: &mut Vault, args: SetArgs, out: &mut impl Write) -> anyhow::Result<()> {
    vault
        .set(&args.key, &args.value, args.global)
        .await
        .with_context(|| format!("Failed to set '{}'", args.key))?;

    let scope = if args.global { "global" } else { "project" };
    render::success(out, &format!("Set {} ({scope})", args.key))?;
    Ok(())
}

pub async fn mv(vault: &mut Vault, args: MvArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let target = if args.project {
        RenameTarget::Project
    } else {
        RenameTarget::Key {
            global: args.global,
        }
    };

    let affected = vault
        .rename(&args.previous, &args.next, target)
        .await
        .with_context(|| format!("Failed to rename '{}'", args.previous))?;

    if affected == 0 {
        render::warning(out, &format!("Nothing named '{}' to rename", args.previous))?;
    } else {
        render::success(
            out,
            &format!("Renamed {} -> {} ({affected} version(s))", args.previous, args.next),
        )?;
    }
    Ok(())
}

pub async fn rm(vault: &mut Vault, args: RmArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let deleted = vault
        .delete(&args.key, args.all, args.global)
        .await
        .with_context(|| format!("Failed to remove '{}'", args.key))?;

    render::success(
        out,
        &format!("Removed {} ({} version(s))", args.key, deleted.len()),
    )?;
    Ok(())
}

/// Print the effective value of one variable. An unknown key prints nothing.
pub fn grep(vault: &Vault, args: GrepArgs, out: &mut impl Write) -> anyhow::Result<()> {
    if let Some(value) = vault.get(&args.key) {
        writeln!(out, "{}", value.expose_secret())?;
    }
    Ok(())
}

/// Print the stored versions of one variable, newest first.
///
/// Deprecated versions written before a key rotation no longer decrypt
/// under the active key and are listed without their value.
pub async fn history(vault: &Vault, args: HistoryArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let versions = vault
        .history(&args.key, args.global, args.all)
        .await
        .with_context(|| format!("Failed to read history of '{}'", args.key))?;

    let mut rows = Vec::with_capacity(versions.len());
    for version in &versions {
        let value = match vault.reveal(version) {
            Ok(value) => value.expose_secret().to_string(),
            Err(VaultError::Decryption(_)) => "<sealed under a previous key>".to_string(),
            Err(e) => return Err(e.into()),
        };
        let state = if version.deprecated { "deprecated" } else { "active" };
        rows.push(vec![version.version_id.to_string(), state.to_string(), value]);
    }

    render::table(out, &["Version", "State", "Value"], &rows)?;
    Ok(())
}
