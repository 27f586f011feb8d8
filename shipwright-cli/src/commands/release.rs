//! Release command
//!
//! Looks up the release of a tag on the hosting platform. A run for a tag
//! that already has a release fails its package branch, so this is the
//! check to make before re-running.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use shipwright_client::HostingClient;
use shipwright_core::{RepositoryIdentity, Secret, Tag};

use crate::config::Config;

/// Arguments of `shipwright release`
#[derive(Args, Debug)]
pub struct ReleaseArgs {
    /// Repository identity (owner/name)
    #[arg(long, env = "SHIPWRIGHT_REPOSITORY")]
    repository: String,

    /// Release tag (e.g., v1.2.3)
    #[arg(long)]
    tag: String,

    /// Hosting platform token
    #[arg(long, env = "HOSTING_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

/// Handle the release command
pub async fn handle_release(args: ReleaseArgs, config: &Config) -> Result<()> {
    let identity = RepositoryIdentity::parse(&args.repository)?;
    let tag = Tag::parse(&args.tag)?;
    let client = HostingClient::new(
        config.api_url.clone(),
        args.token.map(Secret::from).unwrap_or_default(),
    );

    let release = client
        .get_release_by_tag(&identity.owner, &identity.name, tag.as_str())
        .await
        .with_context(|| format!("Failed to look up release {} of {}", tag, identity))?;

    match release {
        Some(release) => {
            println!(
                "{}",
                format!("Release {} exists for {}", release.id, tag)
                    .yellow()
                    .bold()
            );
            if let Some(name) = release.name {
                println!("  Title:   {}", name.bold());
            }
            if let Some(url) = release.html_url {
                println!("  URL:     {}", url.cyan());
            }
            if let Some(created_at) = release.created_at {
                println!(
                    "  Created: {}",
                    created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed()
                );
            }
            println!(
                "  {}",
                "A release run for this tag will fail its package branch.".dimmed()
            );
        }
        None => {
            println!(
                "{}",
                format!("✓ No release exists for {} in {}", tag, identity)
                    .green()
                    .bold()
            );
        }
    }

    Ok(())
}
