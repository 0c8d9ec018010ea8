//! Bulk commands: `cat`, `dump`, `import`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use envkeep_core::env;
use envkeep_secrets::Vault;

use crate::render;

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Output file
    #[arg(short, long, default_value = "./.env")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// .env file to read
    pub file: PathBuf,
}

fn write_env(vault: &Vault, out: &mut impl Write) -> std::io::Result<()> {
    for (key, value) in vault.entries().iter() {
        writeln!(out, "{}", render::env_line(key, value.expose_secret()))?;
    }
    Ok(())
}

/// Print every resolved variable as `KEY=value`.
pub fn cat(vault: &Vault, out: &mut impl Write) -> anyhow::Result<()> {
    write_env(vault, out)?;
    Ok(())
}

/// Write every resolved variable to `args.output`, readable by the owner only.
pub fn dump(vault: &Vault, args: DumpArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let mut file = create_private(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    write_env(vault, &mut file)?;
    file.sync_all()?;

    render::success(
        out,
        &format!(
            "Wrote {} variable(s) to {}",
            vault.entries().len(),
            args.output.display()
        ),
    )?;
    Ok(())
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

/// Set every pair of a `.env` file in the caller's project.
pub async fn import(vault: &mut Vault, args: ImportArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let pairs = env::read_dotenv(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    for (key, value) in &pairs {
        vault
            .set(key, value, false)
            .await
            .with_context(|| format!("Failed to set '{key}'"))?;
    }

    render::success(
        out,
        &format!("Imported {} variable(s) from {}", pairs.len(), args.file.display()),
    )?;
    Ok(())
}
