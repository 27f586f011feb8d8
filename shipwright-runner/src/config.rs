//! Runner configuration
//!
//! Everything a release run needs is read once from the environment at start
//! and then shared read-only by both branches. CI-provided variables
//! (`GITHUB_REF`, `GITHUB_REPOSITORY`, ...) are used as fallbacks so the runner
//! works unchanged inside a workflow.

use anyhow::Context;
use shipwright_core::{Secret, TagConventions};
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::EngineKind;
use crate::retry::RetryPolicy;

/// Package registry settings
#[derive(Debug, Clone)]
pub struct PackageConfig {
    /// Manifest of the package to publish, relative to the workspace
    pub manifest_path: PathBuf,
    /// Alternate registry name; `None` publishes to the default registry
    pub registry: Option<String>,
    /// Publish without the registry's verification build
    pub skip_verification: bool,
    pub token: Secret,
}

/// Image registry and build settings
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Registry host (e.g., "ghcr.io")
    pub registry: String,
    /// Build recipe, relative to the workspace
    pub containerfile: PathBuf,
    pub engine: EngineKind,
    pub username: String,
    pub token: Secret,
    pub conventions: TagConventions,
}

/// Hosting platform settings
#[derive(Debug, Clone)]
pub struct HostingConfig {
    /// REST API base (e.g., "https://api.github.com")
    pub api_url: String,
    /// Web base used for source labels (e.g., "https://github.com")
    pub web_url: String,
    pub token: Secret,
    pub title_template: String,
    pub body_template: String,
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Ref that triggered the run
    pub git_ref: Option<String>,
    /// `owner/name`; validated by the branches that use it
    pub repository: String,
    /// Commit being released
    pub revision: Option<String>,
    pub source_date_epoch: Option<i64>,
    /// Repository checkout
    pub workspace: PathBuf,
    pub package: PackageConfig,
    pub image: ImageConfig,
    pub hosting: HostingConfig,
    pub retry: RetryPolicy,
    /// Where to write the JSON run report
    pub report_path: Option<PathBuf>,
}

pub const DEFAULT_TITLE_TEMPLATE: &str = "{tag}";
pub const DEFAULT_BODY_TEMPLATE: &str =
    "Release {tag} of {repository}.\n\nPrevious release: {previous_tag}";

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - SHIPWRIGHT_REPOSITORY or GITHUB_REPOSITORY (required)
    /// - SHIPWRIGHT_REF or GITHUB_REF (optional, newest tag when absent)
    /// - CARGO_REGISTRY_TOKEN, IMAGE_REGISTRY_TOKEN, HOSTING_TOKEN or GITHUB_TOKEN
    /// - see `from_lookup` for the full list
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_any = |keys: &[&str]| keys.iter().find_map(|key| get(key));

        let repository = get_any(&["SHIPWRIGHT_REPOSITORY", "GITHUB_REPOSITORY"])
            .ok_or_else(|| anyhow::anyhow!("SHIPWRIGHT_REPOSITORY environment variable not set"))?;

        let source_date_epoch = get("SOURCE_DATE_EPOCH")
            .map(|s| s.parse::<i64>())
            .transpose()
            .context("SOURCE_DATE_EPOCH must be an integer")?;

        let engine = get("SHIPWRIGHT_CONTAINER_ENGINE")
            .map(|s| s.parse::<EngineKind>())
            .transpose()?
            .unwrap_or_default();

        let defaults = RetryPolicy::default();
        let max_retries = get("SHIPWRIGHT_MAX_RETRIES")
            .map(|s| s.parse::<u32>())
            .transpose()
            .context("SHIPWRIGHT_MAX_RETRIES must be a non-negative integer")?
            .unwrap_or(defaults.max_retries);
        let initial_delay = get("SHIPWRIGHT_RETRY_DELAY_MS")
            .map(|s| s.parse::<u64>())
            .transpose()
            .context("SHIPWRIGHT_RETRY_DELAY_MS must be a non-negative integer")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_delay);

        Ok(Self {
            git_ref: get_any(&["SHIPWRIGHT_REF", "GITHUB_REF"]),
            repository,
            revision: get_any(&["SHIPWRIGHT_REVISION", "GITHUB_SHA"]),
            source_date_epoch,
            workspace: get("SHIPWRIGHT_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            package: PackageConfig {
                manifest_path: get("SHIPWRIGHT_MANIFEST_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("Cargo.toml")),
                registry: get("SHIPWRIGHT_PACKAGE_REGISTRY"),
                skip_verification: parse_flag(get("SHIPWRIGHT_NO_VERIFY"))?,
                token: get("CARGO_REGISTRY_TOKEN").map(Secret::from).unwrap_or_default(),
            },
            image: ImageConfig {
                registry: get("SHIPWRIGHT_IMAGE_REGISTRY").unwrap_or_else(|| "ghcr.io".to_string()),
                containerfile: get("SHIPWRIGHT_CONTAINERFILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("Containerfile")),
                engine,
                username: get("IMAGE_REGISTRY_USERNAME").unwrap_or_default(),
                token: get("IMAGE_REGISTRY_TOKEN").map(Secret::from).unwrap_or_default(),
                conventions: TagConventions {
                    semver_variants: parse_flag(get("SHIPWRIGHT_TAG_SEMVER"))?,
                    latest: parse_flag(get("SHIPWRIGHT_TAG_LATEST"))?,
                },
            },
            hosting: HostingConfig {
                api_url: get("SHIPWRIGHT_HOSTING_API_URL")
                    .unwrap_or_else(|| "https://api.github.com".to_string()),
                web_url: get("SHIPWRIGHT_HOSTING_WEB_URL")
                    .unwrap_or_else(|| "https://github.com".to_string()),
                token: get_any(&["HOSTING_TOKEN", "GITHUB_TOKEN"])
                    .map(Secret::from)
                    .unwrap_or_default(),
                title_template: get("SHIPWRIGHT_RELEASE_TITLE")
                    .unwrap_or_else(|| DEFAULT_TITLE_TEMPLATE.to_string()),
                body_template: get("SHIPWRIGHT_RELEASE_BODY")
                    .unwrap_or_else(|| DEFAULT_BODY_TEMPLATE.to_string()),
            },
            retry: RetryPolicy {
                max_retries,
                initial_delay,
                ..defaults
            },
            report_path: get("SHIPWRIGHT_REPORT_PATH").map(PathBuf::from),
        })
    }

    /// Validates the configuration
    ///
    /// The repository identity is not parsed here; a malformed
    /// identity fails the image branch only.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.repository.trim().is_empty() {
            anyhow::bail!("repository cannot be empty");
        }

        for (name, url) in [
            ("hosting api url", &self.hosting.api_url),
            ("hosting web url", &self.hosting.web_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.image.registry.contains("://") || self.image.registry.ends_with('/') {
            anyhow::bail!("image registry must be a bare host (e.g., ghcr.io)");
        }

        if self.retry.max_retries > 10 {
            anyhow::bail!("max_retries cannot exceed 10");
        }

        if self.hosting.title_template.trim().is_empty() {
            anyhow::bail!("release title template cannot be empty");
        }

        Ok(())
    }

    /// Package manifest resolved against the workspace
    pub fn manifest_path(&self) -> PathBuf {
        self.workspace.join(&self.package.manifest_path)
    }

    /// Build recipe resolved against the workspace
    pub fn containerfile_path(&self) -> PathBuf {
        self.workspace.join(&self.image.containerfile)
    }
}

fn parse_flag(value: Option<String>) -> anyhow::Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => anyhow::bail!("invalid boolean value `{}`", other),
    }
}
