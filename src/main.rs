//! Credit-default experiment - Main Entry Point

use clap::Parser;
use credit_default::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credit_default=info".into()),
        )
        .init();

    let cli = Cli::parse();
    run(&cli)
}
