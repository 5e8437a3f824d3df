//! reqman CLI binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use reqman::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match commands::build_manager(&cli) {
        Ok(manager) => match &cli.command {
            Commands::Get(args) => commands::handle_get(&manager, args).await,
            Commands::Send(args) => commands::handle_send(&manager, args).await,
            Commands::Batch(args) => commands::handle_batch(&manager, args).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
