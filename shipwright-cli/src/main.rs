//! Shipwright CLI
//!
//! Local inspection of what a release run would do: which tags it resolves,
//! which image metadata it derives and whether the release already exists.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "shipwright")]
#[command(about = "Tag-triggered release tooling", long_about = None)]
struct Cli {
    /// Hosting platform API URL
    #[arg(
        long,
        env = "SHIPWRIGHT_HOSTING_API_URL",
        default_value = "https://api.github.com"
    )]
    api_url: String,

    /// Hosting platform web URL
    #[arg(
        long,
        env = "SHIPWRIGHT_HOSTING_WEB_URL",
        default_value = "https://github.com"
    )]
    web_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        api_url: cli.api_url,
        web_url: cli.web_url,
    };

    handle_command(cli.command, &config).await
}
