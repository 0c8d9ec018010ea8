//! envkeep CLI entry point.

use clap::Parser;
use envkeep_cli::{init_tracing, run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.global.debug_enabled());

    // Run the command
    run(cli).await
}
