//! tpack - package builder CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tpack_cli::cmd;
use tpack_cli::{Cli, Commands, DepsCommands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack(args) => cmd::pack::pack(args).await,
        Commands::Deps { command } => match command {
            DepsCommands::Check { file } => cmd::deps::check(&file),
        },
    }
}
