//! `info`: show the resolved caller context.

use std::io::Write;

use envkeep_core::Config;

/// Print project, driver, connection string, and version. The encryption
/// key is only reported as set or missing.
pub fn run(config: &Config, out: &mut impl Write) -> anyhow::Result<()> {
    let connection_string = config
        .connection_string()
        .unwrap_or_else(|e| format!("<{e}>"));
    let key_state = match &config.encryption_key {
        Some(key) if !key.is_empty() => "[REDACTED]",
        _ => "<not set>",
    };

    writeln!(out, "Project: {}", config.project)?;
    writeln!(out, "Database driver: {}", config.driver)?;
    writeln!(out, "Database connection string: {connection_string}")?;
    writeln!(out, "Encryption key: {key_state}")?;
    writeln!(out, "Debug: {}", config.debug)?;
    writeln!(out, "Version: v{}", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
