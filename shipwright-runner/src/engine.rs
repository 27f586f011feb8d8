//! Container engine access
//!
//! Drives `podman` or `docker` through their CLI:
//! - Checking the engine is installed
//! - Logging in to the image registry
//! - Building one image with every tag and label
//! - Pushing a single reference

use async_trait::async_trait;
use shipwright_core::{PublishError, Secret};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::process::Command;
use tracing::{debug, info};

use crate::process::{self, classify_registry_failure};

/// Supported container engine CLIs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineKind {
    #[default]
    Podman,
    Docker,
}

impl EngineKind {
    pub fn program(self) -> &'static str {
        match self {
            EngineKind::Podman => "podman",
            EngineKind::Docker => "docker",
        }
    }
}

impl FromStr for EngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "podman" => Ok(EngineKind::Podman),
            "docker" => Ok(EngineKind::Docker),
            other => anyhow::bail!("unsupported container engine `{}` (podman or docker)", other),
        }
    }
}

/// Everything needed to build the release image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Directory sent to the engine as build context
    pub context_dir: PathBuf,
    /// Containerfile / Dockerfile
    pub recipe: PathBuf,
    /// Full `repository:tag` references to tag the image with
    pub references: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

/// Operations the image publisher needs from a container engine
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Fails when the engine cannot be executed
    async fn check_available(&self) -> Result<(), PublishError>;

    async fn login(&self, registry: &str, username: &str, token: &Secret)
    -> Result<(), PublishError>;

    async fn build(&self, request: &BuildRequest) -> Result<(), PublishError>;

    async fn push(&self, reference: &str) -> Result<(), PublishError>;
}

/// [`ContainerEngine`] backed by the podman or docker CLI
#[derive(Debug, Clone)]
pub struct CliEngine {
    kind: EngineKind,
}

impl CliEngine {
    pub fn new(kind: EngineKind) -> Self {
        Self { kind }
    }

    fn command(&self) -> Command {
        Command::new(self.kind.program())
    }

    /// Arguments of the build invocation, without the program name
    fn build_args(request: &BuildRequest) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "--file".to_string(),
            request.recipe.to_string_lossy().to_string(),
        ];

        for reference in &request.references {
            args.push("--tag".to_string());
            args.push(reference.clone());
        }

        for (key, value) in &request.labels {
            args.push("--label".to_string());
            args.push(format!("{}={}", key, value));
        }

        args.push(request.context_dir.to_string_lossy().to_string());
        args
    }
}

#[async_trait]
impl ContainerEngine for CliEngine {
    async fn check_available(&self) -> Result<(), PublishError> {
        let program = self.kind.program();
        let mut command = self.command();
        command.arg("--version");

        let output = process::run(&mut command, &format!("{} --version", program)).await?;
        if !output.success {
            return Err(PublishError::Tool(format!(
                "{} is not working correctly: {}",
                program,
                output.diagnostic()
            )));
        }

        info!("{} is available: {}", program, output.stdout.trim());
        Ok(())
    }

    async fn login(
        &self,
        registry: &str,
        username: &str,
        token: &Secret,
    ) -> Result<(), PublishError> {
        info!("Logging in to {} as {}", registry, username);

        let mut command = self.command();
        command
            .arg("login")
            .arg("--username")
            .arg(username)
            .arg("--password-stdin")
            .arg(registry);

        let output = process::run_with_stdin(&mut command, "registry login", token.expose()).await?;
        if !output.success {
            return Err(match classify_registry_failure(&output.diagnostic()) {
                PublishError::Rejected(reason) => PublishError::Credential(reason),
                other => other,
            });
        }

        Ok(())
    }

    async fn build(&self, request: &BuildRequest) -> Result<(), PublishError> {
        info!(
            "Building image from {} with {} tag(s)",
            request.recipe.display(),
            request.references.len()
        );

        let args = Self::build_args(request);
        debug!("{} {}", self.kind.program(), args.join(" "));

        let mut command = self.command();
        command.args(&args);

        let output = process::run(&mut command, "image build").await?;
        if !output.success {
            return Err(PublishError::BuildFailed(format!(
                "exit_code={}: {}",
                output.exit_code,
                output.diagnostic()
            )));
        }

        info!("Image built successfully");
        Ok(())
    }

    async fn push(&self, reference: &str) -> Result<(), PublishError> {
        debug!("Pushing {}", reference);

        let mut command = self.command();
        command.arg("push").arg(reference);

        let output = process::run(&mut command, "image push").await?;
        if !output.success {
            return Err(classify_registry_failure(&output.diagnostic()));
        }

        Ok(())
    }
}
