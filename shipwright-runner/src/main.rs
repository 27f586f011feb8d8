//! Shipwright Runner
//!
//! Publishes one release when a version tag is pushed.
//!
//! Architecture:
//! - Configuration: Load settings from the environment (CI variables as fallback)
//! - Repositories: HTTP communication with the hosting platform
//! - Services: Package, release note and image publishers
//! - Orchestrator: Tag resolution and the two concurrent publish branches
//!
//! The process exit code reflects the run status: 0 when both branches
//! succeeded, 2 when exactly one did, 1 otherwise.

mod config;
mod engine;
mod git;
mod orchestrator;
mod process;
mod repository;
mod retry;
mod service;

use anyhow::{Context, Result};
use shipwright_client::HostingClient;
use shipwright_core::EventContext;
use shipwright_core::domain::run::RunReport;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::engine::CliEngine;
use crate::orchestrator::{Orchestrator, Publishers, RunSettings};
use crate::repository::HttpReleaseRepository;
use crate::service::{CargoPackagePublisher, EngineImagePublisher, PlatformReleaseNotePublisher};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shipwright_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shipwright Runner");

    let config = load_config()?;
    info!(
        "Loaded configuration: repository={}, ref={}, engine={}",
        config.repository,
        config.git_ref.as_deref().unwrap_or("<none>"),
        config.image.engine.program()
    );

    let publishers = build_publishers(&config)?;
    info!("Publishers initialized");

    let history = match git::tag_history(&config.workspace).await {
        Ok(history) => history,
        Err(e) => {
            warn!("Could not read tag history, continuing without it: {:#}", e);
            Vec::new()
        }
    };

    let orchestrator = Orchestrator::new(RunSettings::from_config(&config), publishers);
    let event = EventContext::new(config.git_ref.clone(), history);

    let report = match orchestrator.run(&event).await {
        Ok(report) => report,
        Err(e) => {
            error!("Nothing to release: {}", e);
            std::process::exit(1);
        }
    };

    summarize(&report);

    if let Some(ref path) = config.report_path {
        if let Err(e) = write_report(path, &report).await {
            error!("Failed to write run report: {:#}", e);
        }
    }

    std::process::exit(report.status.exit_code());
}

/// Loads and validates configuration from environment variables
fn load_config() -> Result<Config> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

fn build_publishers(config: &Config) -> Result<Publishers> {
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    let hosting = HostingClient::with_client(
        config.hosting.api_url.clone(),
        config.hosting.token.clone(),
        http,
    );

    if config.hosting.token.is_empty() {
        warn!("No hosting token configured, release creation will be unauthenticated");
    }

    Ok(Publishers {
        package: Arc::new(CargoPackagePublisher::new(
            config.package.registry.clone(),
            config.package.skip_verification,
            config.retry,
        )),
        release_notes: Arc::new(PlatformReleaseNotePublisher::new(
            HttpReleaseRepository::new(hosting),
            config.repository.clone(),
            config.retry,
        )),
        image: Arc::new(EngineImagePublisher::new(
            CliEngine::new(config.image.engine),
            config.retry,
        )),
    })
}

/// Logs one line per branch
fn summarize(report: &RunReport) {
    info!("Run {} for {}: {:?}", report.run_id, report.tag, report.status);
    for branch in report.branches() {
        match &branch.diagnostic {
            Some(diagnostic) => error!("  - {}: {:?} ({})", branch.branch, branch.state, diagnostic),
            None => info!("  - {}: {:?}", branch.branch, branch.state),
        }
    }
}

async fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Run report written to {}", path.display());
    Ok(())
}
