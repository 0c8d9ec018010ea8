//! envkeep command-line interface.

pub mod commands;
pub mod render;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use envkeep_core::{BackendDriver, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// envkeep - encrypted, versioned environment variables
#[derive(Parser)]
#[command(name = "envkeep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
///
/// Project and encryption key come from the config file or `ENVKEEP_*`
/// variables; the flags here override the file and the environment.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct GlobalArgs {
    /// Enable debug logs
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true, env = "ENVKEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database driver (sqlite, postgres)
    #[arg(long, global = true)]
    pub driver: Option<BackendDriver>,

    /// Database path or connection string
    #[arg(long = "db", global = true)]
    pub connection_string: Option<String>,
}

impl GlobalArgs {
    /// Resolve the caller context: file, then environment, then flags.
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config =
            Config::resolve(self.config.as_deref()).context("Failed to load configuration")?;

        if let Some(driver) = self.driver {
            config.driver = driver;
        }
        if let Some(connection_string) = &self.connection_string {
            config.connection_string = Some(connection_string.clone());
        }
        if self.debug {
            config.debug = true;
        }

        Ok(config)
    }

    /// Whether debug logs were requested by flag, environment, or config
    /// file. A config that fails to load falls back to the flag alone.
    pub fn debug_enabled(&self) -> bool {
        self.resolve_config()
            .map(|config| config.debug)
            .unwrap_or(self.debug)
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Set an environment variable
    Set(commands::secrets::SetArgs),

    /// Rename an environment variable or project
    Mv(commands::secrets::MvArgs),

    /// Remove an environment variable
    Rm(commands::secrets::RmArgs),

    /// Get the value of an environment variable
    Grep(commands::secrets::GrepArgs),

    /// Show the stored versions of an environment variable
    History(commands::secrets::HistoryArgs),

    /// List all environment variables
    Cat,

    /// Write all environment variables to a file
    Dump(commands::export::DumpArgs),

    /// Set every variable of a .env file in the current project
    Import(commands::export::ImportArgs),

    /// Change the encryption key
    Rotate(commands::maintenance::RotateArgs),

    /// Delete old versions of environment variables
    Prune(commands::maintenance::PruneArgs),

    /// Show version counts per variable
    Stat,

    /// Show envkeep configuration
    Info,

    /// Show version information
    Version,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` selects between
/// `envkeep=debug` and `envkeep=warn`.
pub fn init_tracing(debug: bool) {
    let default_filter = if debug { "envkeep=debug" } else { "envkeep=warn" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Version = cli.command {
        println!("envkeep {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = cli.global.resolve_config()?;
    let mut out = std::io::stdout();

    if let Commands::Info = cli.command {
        return commands::info::run(&config, &mut out);
    }

    let mut vault = commands::open(&config).await?;

    let result = match cli.command {
        Commands::Set(args) => commands::secrets::set(&mut vault, args, &mut out).await,
        Commands::Mv(args) => commands::secrets::mv(&mut vault, args, &mut out).await,
        Commands::Rm(args) => commands::secrets::rm(&mut vault, args, &mut out).await,
        Commands::Grep(args) => commands::secrets::grep(&vault, args, &mut out),
        Commands::History(args) => commands::secrets::history(&vault, args, &mut out).await,
        Commands::Cat => commands::export::cat(&vault, &mut out),
        Commands::Dump(args) => commands::export::dump(&vault, args, &mut out),
        Commands::Import(args) => commands::export::import(&mut vault, args, &mut out).await,
        Commands::Rotate(args) => commands::maintenance::rotate(&mut vault, args, &mut out).await,
        Commands::Prune(args) => commands::maintenance::prune(&mut vault, args, &mut out).await,
        Commands::Stat => commands::maintenance::stat(&vault, &mut out).await,
        Commands::Info | Commands::Version => Ok(()),
    };

    vault.close().await;
    result
}
