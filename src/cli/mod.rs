//! CLI entry point for reqman.

pub mod commands;

use clap::{Parser, Subcommand};

/// reqman CLI
#[derive(Parser, Debug)]
#[command(name = "reqman", version, about = "Deduplicating, caching API request manager")]
pub struct Cli {
    /// Host of the calling context (selects the local or remote base URL)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Base URL used regardless of host
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// GET an endpoint, optionally several times concurrently
    Get(GetArgs),
    /// Send a request with an explicit method and JSON body
    Send(SendArgs),
    /// Run a batch described by a JSON file
    Batch(BatchArgs),
}

/// Arguments for `reqman get`.
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Endpoint path or absolute URL
    pub endpoint: String,

    /// Number of concurrent identical requests
    #[arg(short, long, default_value = "1")]
    pub repeat: usize,

    /// Skip the cache lookup
    #[arg(long)]
    pub bypass_cache: bool,
}

/// Arguments for `reqman send`.
#[derive(Parser, Debug)]
pub struct SendArgs {
    /// Endpoint path or absolute URL
    pub endpoint: String,

    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    #[arg(short, long, default_value = "POST")]
    pub method: String,

    /// JSON body
    #[arg(short, long)]
    pub body: Option<String>,

    /// CSRF token to send on state-changing requests
    #[arg(long, env = "REQMAN_CSRF_TOKEN")]
    pub csrf_token: Option<String>,
}

/// Arguments for `reqman batch`.
#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// JSON file holding an array of `{id?, endpoint, method?, body?, bypass_cache?}`
    pub file: std::path::PathBuf,
}
