//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod metadata;
mod release;
mod resolve;

pub use metadata::MetadataArgs;
pub use release::ReleaseArgs;
pub use resolve::ResolveArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the current and previous release tag
    Resolve(ResolveArgs),
    /// Show the image tags and labels derived for a release
    Metadata(MetadataArgs),
    /// Check whether a release exists for a tag
    Release(ReleaseArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Resolve(args) => resolve::handle_resolve(args),
        Commands::Metadata(args) => metadata::handle_metadata(args, config),
        Commands::Release(args) => release::handle_release(args, config).await,
    }
}
