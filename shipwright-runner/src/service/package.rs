//! Package publisher
//!
//! Pushes the already-built artifact to the package registry with
//! `cargo publish`. The registry token is handed over through the child's
//! environment, never on the command line.

use async_trait::async_trait;
use shipwright_core::domain::release::PackageReceipt;
use shipwright_core::{PublishError, Secret, Tag};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{info, warn};

use crate::process::{self, ToolOutput, classify_registry_failure};
use crate::retry::RetryPolicy;

/// The artifact to publish and the version it is published under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactContext {
    pub manifest_path: PathBuf,
    pub version: Tag,
}

/// Service trait for publishing the package
#[async_trait]
pub trait PackagePublisher: Send + Sync {
    /// Publishes the artifact
    ///
    /// # Arguments
    /// * `artifact` - Manifest and version to publish
    /// * `token` - Package registry credential
    ///
    /// # Returns
    /// A receipt for the published version, or the first non-retriable error
    async fn publish(
        &self,
        artifact: &ArtifactContext,
        token: &Secret,
    ) -> Result<PackageReceipt, PublishError>;
}

/// [`PackagePublisher`] running `cargo publish`
#[derive(Debug, Clone)]
pub struct CargoPackagePublisher {
    program: String,
    registry: Option<String>,
    skip_verification: bool,
    retry: RetryPolicy,
}

const DUPLICATE_MARKERS: &[&str] = &["already exists", "already uploaded", "is already published"];

impl CargoPackagePublisher {
    pub fn new(registry: Option<String>, skip_verification: bool, retry: RetryPolicy) -> Self {
        Self {
            program: "cargo".to_string(),
            registry,
            skip_verification,
            retry,
        }
    }

    /// Arguments of the publish invocation, without the program name
    fn publish_args(&self, artifact: &ArtifactContext) -> Vec<String> {
        let mut args = vec![
            "publish".to_string(),
            "--manifest-path".to_string(),
            artifact.manifest_path.to_string_lossy().to_string(),
        ];

        if let Some(ref registry) = self.registry {
            args.push("--registry".to_string());
            args.push(registry.clone());
        }

        if self.skip_verification {
            args.push("--no-verify".to_string());
        }

        args
    }

    async fn attempt_publish(
        &self,
        artifact: &ArtifactContext,
        token: &Secret,
    ) -> Result<(), PublishError> {
        let mut command = Command::new(&self.program);
        command
            .args(self.publish_args(artifact))
            .env("CARGO_REGISTRY_TOKEN", token.expose());

        if let Some(ref registry) = self.registry {
            // cargo reads alternate registry tokens from CARGO_REGISTRIES_<NAME>_TOKEN
            let key = format!(
                "CARGO_REGISTRIES_{}_TOKEN",
                registry.to_ascii_uppercase().replace('-', "_")
            );
            command.env(key, token.expose());
        }

        let output = process::run(&mut command, "cargo publish").await?;
        if output.success {
            return Ok(());
        }

        Err(classify_publish_failure(&output, artifact))
    }
}

/// Maps a failed `cargo publish` to the error taxonomy
fn classify_publish_failure(output: &ToolOutput, artifact: &ArtifactContext) -> PublishError {
    let diagnostic = output.diagnostic();
    let lower = diagnostic.to_ascii_lowercase();

    if DUPLICATE_MARKERS.iter().any(|m| lower.contains(m)) {
        return PublishError::DuplicateVersion {
            version: artifact.version.version().to_string(),
        };
    }

    classify_registry_failure(&diagnostic)
}

/// Settles the outcome of a retried publish
///
/// Only transient failures are retried, so a duplicate version reported on a
/// later attempt means an earlier upload reached the registry before its
/// response was lost.
fn confirm_upload(result: Result<(), PublishError>, attempts: u32) -> Result<(), PublishError> {
    match result {
        Err(PublishError::DuplicateVersion { version }) if attempts > 1 => {
            warn!(
                "Registry reports {} as already published on attempt {}, treating an earlier upload as landed",
                version, attempts
            );
            Ok(())
        }
        other => other,
    }
}

#[async_trait]
impl PackagePublisher for CargoPackagePublisher {
    async fn publish(
        &self,
        artifact: &ArtifactContext,
        token: &Secret,
    ) -> Result<PackageReceipt, PublishError> {
        if token.is_empty() {
            return Err(PublishError::Credential(
                "no package registry token configured".to_string(),
            ));
        }

        if self.skip_verification {
            warn!(
                "Publishing {} without verification: the registry will not rebuild the package before it becomes visible",
                artifact.version
            );
        }

        info!(
            "Publishing {} from {}",
            artifact.version,
            artifact.manifest_path.display()
        );

        let retried = self
            .retry
            .run("cargo publish", || self.attempt_publish(artifact, token))
            .await;
        confirm_upload(retried.result, retried.attempts)?;

        info!(
            "Published {} after {} attempt(s)",
            artifact.version, retried.attempts
        );

        Ok(PackageReceipt {
            version: artifact.version.version().to_string(),
            registry: self.registry.clone(),
            attempts: retried.attempts,
            verification_skipped: self.skip_verification,
        })
    }
}
