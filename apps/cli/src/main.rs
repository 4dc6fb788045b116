//! TrackTect CLI: competitive-intelligence tracking runs.
//!
//! Scrapes company web properties, classifies what changed, watches landing
//! page messaging, collects recent social posts, and publishes the digest.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
