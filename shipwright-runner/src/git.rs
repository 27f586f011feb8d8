//! Tag history from the local checkout

use anyhow::{Context, Result, bail};
use shipwright_core::parse_tag_list;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::process;

/// Lists the repository's tags, oldest first
pub async fn tag_history(workspace: &Path) -> Result<Vec<String>> {
    let mut command = Command::new("git");
    command
        .arg("-C")
        .arg(workspace)
        .args(["tag", "--list", "--sort=creatordate"]);

    let output = process::run(&mut command, "git tag")
        .await
        .context("Failed to read tag history")?;
    if !output.success {
        bail!("git tag failed: {}", output.diagnostic());
    }

    let tags = parse_tag_list(&output.stdout);
    debug!("Found {} tag(s) in {}", tags.len(), workspace.display());
    Ok(tags)
}
