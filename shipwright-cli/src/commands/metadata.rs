//! Metadata command
//!
//! Prints the image tags and OCI labels a release would be published with.

use anyhow::Result;
use clap::Args;
use colored::*;
use shipwright_core::{ImageMetadata, MetadataDeriver, Tag, TagConventions};

use crate::config::Config;

/// Arguments of `shipwright metadata`
#[derive(Args, Debug)]
pub struct MetadataArgs {
    /// Repository identity (owner/name)
    #[arg(long, env = "SHIPWRIGHT_REPOSITORY")]
    pub repository: String,

    /// Release tag (e.g., v1.2.3)
    #[arg(long)]
    pub tag: String,

    /// Also tag MAJOR.MINOR.PATCH, MAJOR.MINOR and MAJOR
    #[arg(long)]
    pub semver: bool,

    /// Also tag `latest`
    #[arg(long)]
    pub latest: bool,

    /// Revision label value; the tag is used when omitted
    #[arg(long)]
    pub revision: Option<String>,

    /// Build time as seconds since the epoch
    #[arg(long, env = "SOURCE_DATE_EPOCH")]
    pub source_date_epoch: Option<i64>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Handle the metadata command
pub fn handle_metadata(args: MetadataArgs, config: &Config) -> Result<()> {
    let (tag, metadata) = derive_metadata(&args, config)?;
    println!("{}", render(&tag, &metadata, args.json)?);
    Ok(())
}

fn derive_metadata(args: &MetadataArgs, config: &Config) -> Result<(Tag, ImageMetadata)> {
    let tag = Tag::parse(&args.tag)?;
    let deriver = MetadataDeriver::new(config.web_url.clone())
        .with_conventions(TagConventions {
            semver_variants: args.semver,
            latest: args.latest,
        })
        .with_revision(args.revision.clone())
        .with_source_date_epoch(args.source_date_epoch);

    let metadata = deriver.derive(&args.repository, &tag)?;
    Ok((tag, metadata))
}

fn render(tag: &Tag, metadata: &ImageMetadata, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(metadata)?);
    }

    let mut lines = vec![
        format!("Image metadata for {}", tag).bold().to_string(),
        String::new(),
        format!("  {}", "Tags:".bold()),
    ];
    for image_tag in &metadata.tags {
        lines.push(format!("    {} {}", "▸".cyan(), image_tag));
    }
    lines.push(format!("  {}", "Labels:".bold()));
    for (key, value) in &metadata.labels {
        lines.push(format!("    {} = {}", key.dimmed(), value));
    }

    Ok(lines.join("\n"))
}
