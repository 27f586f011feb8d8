//! Resolve command
//!
//! Shows which tag a release run would publish and which release it follows.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::*;
use shipwright_core::{EventContext, ResolvedTags, TagResolver, parse_tag_list};
use std::process::Command;

/// Arguments of `shipwright resolve`
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Triggering ref (e.g., refs/tags/v1.2.3); newest tag when omitted
    #[arg(long = "ref", env = "SHIPWRIGHT_REF")]
    git_ref: Option<String>,

    /// Tag history entry, oldest first, repeatable; read from `git tag` when omitted
    #[arg(long)]
    history: Vec<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

/// Handle the resolve command
pub fn handle_resolve(args: ResolveArgs) -> Result<()> {
    let history = if args.history.is_empty() {
        git_tag_history()?
    } else {
        args.history
    };

    let resolved = TagResolver::new().resolve(&EventContext::new(args.git_ref, history))?;
    println!("{}", render(&resolved, args.json)?);
    Ok(())
}

fn render(resolved: &ResolvedTags, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(resolved)?);
    }

    let mut lines = vec![
        "✓ Release tag resolved".green().bold().to_string(),
        format!("  Current:  {}", resolved.current.as_str().cyan()),
    ];
    match &resolved.previous {
        Some(previous) => lines.push(format!("  Previous: {}", previous.as_str().cyan())),
        None => lines.push(format!("  Previous: {}", "none (first release)".dimmed())),
    }
    if resolved.current.is_prerelease() {
        lines.push(format!("  {}", "pre-release".yellow()));
    }

    Ok(lines.join("\n"))
}

fn git_tag_history() -> Result<Vec<String>> {
    let output = Command::new("git")
        .args(["tag", "--list", "--sort=creatordate"])
        .output()
        .context("Failed to run git")?;

    if !output.status.success() {
        bail!(
            "git tag failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(parse_tag_list(&String::from_utf8_lossy(&output.stdout)))
}
