//! toddler-events — Binary Entrypoint
//! Collate library toddler events to take my kid to.
//!
//! Usage:
//!   toddler-events download       Fetch feed pages to local files
//!   toddler-events write          Render the markdown digest from them

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use toddler_events::config::Config;
use toddler_events::{fetch, pipeline};

#[derive(Parser)]
#[command(
    name = "toddler-events",
    version,
    about = "Collate library toddler events into a markdown digest"
)]
struct Cli {
    /// Config filepath
    #[arg(short, long, default_value = "toddler-events.toml")]
    config: PathBuf,

    /// Log level filter (RUST_LOG overrides this when set)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download RSS feed pages to local files
    Download,
    /// Write the markdown digest from downloaded feed pages
    Write,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = Config::load(&cli.config)?;
    match cli.command {
        Command::Download => fetch::run_download(&config).await,
        Command::Write => pipeline::run_write(&config),
    }
}
