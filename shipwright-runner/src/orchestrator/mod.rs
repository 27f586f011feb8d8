//! Release run orchestration
//!
//! Resolves the release tag, then runs the package branch and the image
//! branch as two independent tasks. Each task produces its own
//! [`BranchReport`]; a task that dies is recorded as a failed branch and never
//! affects the other one.

mod branch;

use shipwright_core::domain::run::{Branch, BranchReport, RunReport};
use shipwright_core::{EventContext, MetadataDeriver, ResolutionError, Secret, TagResolver};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::service::{
    ImagePublisher, PackagePublisher, RegistryCredentials, ReleaseNotePublisher, ReleaseTemplate,
};

/// Publishers driven by a run
#[derive(Clone)]
pub struct Publishers {
    pub package: Arc<dyn PackagePublisher>,
    pub release_notes: Arc<dyn ReleaseNotePublisher>,
    pub image: Arc<dyn ImagePublisher>,
}

/// Read-only inputs shared by both branches
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// `owner/name` as configured, unvalidated
    pub repository: String,
    pub manifest_path: PathBuf,
    pub package_token: Secret,
    pub template: ReleaseTemplate,
    pub deriver: MetadataDeriver,
    pub context_dir: PathBuf,
    pub recipe: PathBuf,
    /// Image registry host
    pub image_registry: String,
    pub credentials: RegistryCredentials,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        let deriver = MetadataDeriver::new(config.hosting.web_url.clone())
            .with_conventions(config.image.conventions)
            .with_revision(config.revision.clone())
            .with_source_date_epoch(config.source_date_epoch);

        // token logins ignore the user name, fall back to the repository owner
        let username = if config.image.username.is_empty() {
            config
                .repository
                .split_once('/')
                .map(|(owner, _)| owner.to_string())
                .unwrap_or_else(|| config.repository.clone())
        } else {
            config.image.username.clone()
        };

        Self {
            repository: config.repository.clone(),
            manifest_path: config.manifest_path(),
            package_token: config.package.token.clone(),
            template: ReleaseTemplate::new(
                config.hosting.title_template.clone(),
                config.hosting.body_template.clone(),
            ),
            deriver,
            context_dir: config.workspace.clone(),
            recipe: config.containerfile_path(),
            image_registry: config.image.registry.clone(),
            credentials: RegistryCredentials {
                registry: config.image.registry.clone(),
                username,
                token: config.image.token.clone(),
            },
        }
    }
}

/// Drives one release run
pub struct Orchestrator {
    settings: Arc<RunSettings>,
    publishers: Publishers,
    resolver: TagResolver,
}

impl Orchestrator {
    pub fn new(settings: RunSettings, publishers: Publishers) -> Self {
        Self {
            settings: Arc::new(settings),
            publishers,
            resolver: TagResolver::new(),
        }
    }

    /// Runs both branches to completion
    ///
    /// # Returns
    /// The run report, or the resolution error when no release tag could be
    /// determined. Nothing is published in the latter case.
    pub async fn run(&self, event: &EventContext) -> Result<RunReport, ResolutionError> {
        let tags = self.resolver.resolve(event)?;
        let run_id = Uuid::new_v4();

        info!(
            "Starting release run {} for {} (previous: {})",
            run_id,
            tags.current,
            tags.previous
                .as_ref()
                .map(|t| t.as_str())
                .unwrap_or("none")
        );

        let package = tokio::spawn(branch::run_package(
            Arc::clone(&self.settings),
            Arc::clone(&self.publishers.package),
            Arc::clone(&self.publishers.release_notes),
            tags.clone(),
        ));
        let image = tokio::spawn(branch::run_image(
            Arc::clone(&self.settings),
            Arc::clone(&self.publishers.image),
            tags.current.clone(),
        ));

        let (package, image) = tokio::join!(package, image);
        let package = collect(Branch::Package, package);
        let image = collect(Branch::Image, image);

        let report = RunReport::new(run_id, tags.current, tags.previous, package, image);
        info!("Release run {} finished: {:?}", run_id, report.status);
        Ok(report)
    }
}

/// Turns a finished branch task into its report
///
/// A package task that dies takes its receipt with it, so the diagnostic
/// warns that the package may be live on the registry anyway.
fn collect(branch: Branch, joined: Result<BranchReport, JoinError>) -> BranchReport {
    match joined {
        Ok(report) => report,
        Err(e) => {
            let mut diagnostic = if e.is_panic() {
                format!("{} branch panicked: {}", branch, panic_message(e))
            } else {
                format!("{} branch was cancelled", branch)
            };
            if branch == Branch::Package {
                diagnostic.push_str("; the package may already be published");
            }
            error!("{}", diagnostic);
            BranchReport::abandoned(branch, diagnostic)
        }
    }
}

fn panic_message(e: JoinError) -> String {
    let payload = e.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineKind;
    use crate::retry::RetryPolicy;
    use crate::service::fakes::{
        FakeEngine, FakePackagePublisher, InMemoryReleases, PanickingImagePublisher,
        PanickingReleaseNotes,
    };
    use crate::service::{EngineImagePublisher, PlatformReleaseNotePublisher};
    use shipwright_core::domain::image::TagOutcome;
    use shipwright_core::domain::run::{BranchDetail, BranchState, RunStatus};
    use shipwright_core::{PublishError, TagConventions};

    fn settings(repository: &str, conventions: TagConventions) -> RunSettings {
        RunSettings {
            repository: repository.to_string(),
            manifest_path: PathBuf::from("/src/Cargo.toml"),
            package_token: Secret::new("cargo-token"),
            template: ReleaseTemplate::new("{tag}", "Previous: {previous_tag}"),
            deriver: MetadataDeriver::new("https://github.com").with_conventions(conventions),
            context_dir: PathBuf::from("/src"),
            recipe: PathBuf::from("/src/Containerfile"),
            image_registry: "ghcr.io".to_string(),
            credentials: RegistryCredentials {
                registry: "ghcr.io".to_string(),
                username: "org".to_string(),
                token: Secret::new("image-token"),
            },
        }
    }

    struct Harness {
        package: FakePackagePublisher,
        releases: InMemoryReleases,
        engine: FakeEngine,
        orchestrator: Orchestrator,
    }

    fn harness(package: FakePackagePublisher, engine: FakeEngine, settings: RunSettings) -> Harness {
        harness_with_releases(package, engine, InMemoryReleases::default(), settings)
    }

    fn harness_with_releases(
        package: FakePackagePublisher,
        engine: FakeEngine,
        releases: InMemoryReleases,
        settings: RunSettings,
    ) -> Harness {
        let retry = RetryPolicy::immediate(2);
        let publishers = Publishers {
            package: Arc::new(package.clone()),
            release_notes: Arc::new(PlatformReleaseNotePublisher::new(
                releases.clone(),
                settings.repository.clone(),
                retry,
            )),
            image: Arc::new(EngineImagePublisher::new(engine.clone(), retry)),
        };

        Harness {
            package,
            releases,
            engine,
            orchestrator: Orchestrator::new(settings, publishers),
        }
    }

    fn event(git_ref: &str, history: &[&str]) -> EventContext {
        EventContext::new(
            Some(git_ref.to_string()),
            history.iter().map(|t| t.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_successful_release() {
        let h = harness(
            FakePackagePublisher::succeeding(),
            FakeEngine::default(),
            settings("org/pkg", TagConventions::default()),
        );

        let report = h
            .orchestrator
            .run(&event("refs/tags/v1.2.3", &["v1.2.3"]))
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Succeeded);
        assert_eq!(report.status.exit_code(), 0);
        assert_eq!(report.tag.as_str(), "v1.2.3");
        assert_eq!(report.previous_tag, None);
        assert_eq!(report.package.state, BranchState::Succeeded);
        assert_eq!(report.image.state, BranchState::Succeeded);

        let stored = h.releases.stored("v1.2.3").unwrap();
        assert_eq!(stored.body.as_deref(), Some("Previous: none"));

        match &report.image.detail {
            BranchDetail::Image {
                metadata: Some(metadata),
                push: Some(push),
            } => {
                assert_eq!(metadata.tags, vec!["v1.2.3"]);
                assert_eq!(
                    metadata.labels["org.opencontainers.image.source"],
                    "https://github.com/org/pkg"
                );
                assert_eq!(push.repository, "ghcr.io/org/pkg");
                assert!(push.all_pushed());
            }
            other => panic!("unexpected image detail: {:?}", other),
        }
        assert_eq!(h.engine.push_attempts("ghcr.io/org/pkg:v1.2.3"), 1);
    }

    #[tokio::test]
    async fn test_release_note_mentions_previous_tag() {
        let h = harness(
            FakePackagePublisher::succeeding(),
            FakeEngine::default(),
            settings("org/pkg", TagConventions::default()),
        );

        let report = h
            .orchestrator
            .run(&event("v1.2.3", &["v1.2.2", "nightly", "v1.2.3"]))
            .await
            .unwrap();

        assert_eq!(report.previous_tag.as_ref().map(|t| t.as_str()), Some("v1.2.2"));
        let stored = h.releases.stored("v1.2.3").unwrap();
        assert_eq!(stored.body.as_deref(), Some("Previous: v1.2.2"));
        assert!(matches!(
            report.package.detail,
            BranchDetail::Package {
                receipt: Some(_),
                release: Some(_),
                release_attempted: true
            }
        ));
    }

    #[tokio::test]
    async fn test_package_failure_skips_release_note() {
        let h = harness(
            FakePackagePublisher::failing(PublishError::DuplicateVersion {
                version: "1.2.3".to_string(),
            }),
            FakeEngine::default(),
            settings("org/pkg", TagConventions::default()),
        );

        let report = h.orchestrator.run(&event("v1.2.3", &[])).await.unwrap();

        assert_eq!(report.package.state, BranchState::Failed);
        assert_eq!(report.image.state, BranchState::Succeeded);
        assert_eq!(report.status, RunStatus::PartiallySucceeded);
        assert_eq!(report.status.exit_code(), 2);
        assert_eq!(h.releases.lookup_calls(), 0);
        assert_eq!(h.releases.create_calls(), 0);
        assert!(matches!(
            report.package.detail,
            BranchDetail::Package {
                receipt: None,
                release: None,
                release_attempted: false
            }
        ));
    }

    #[tokio::test]
    async fn test_image_build_failure_leaves_package_branch_alone() {
        let h = harness(
            FakePackagePublisher::succeeding(),
            FakeEngine::default().failing_build(),
            settings("org/pkg", TagConventions::default()),
        );

        let report = h.orchestrator.run(&event("v1.2.3", &[])).await.unwrap();

        assert_eq!(report.package.state, BranchState::Succeeded);
        assert_eq!(report.image.state, BranchState::Failed);
        assert!(
            report
                .image
                .diagnostic
                .as_deref()
                .unwrap()
                .contains("image build failed")
        );
        assert_eq!(report.status, RunStatus::PartiallySucceeded);
        assert!(h.releases.stored("v1.2.3").is_some());
    }

    #[tokio::test]
    async fn test_second_run_for_same_tag_fails_on_duplicate_release() {
        let releases = InMemoryReleases::default();
        let first = harness_with_releases(
            FakePackagePublisher::succeeding(),
            FakeEngine::default(),
            releases.clone(),
            settings("org/pkg", TagConventions::default()),
        );
        let second = harness_with_releases(
            FakePackagePublisher::succeeding(),
            FakeEngine::default(),
            releases.clone(),
            settings("org/pkg", TagConventions::default()),
        );

        let report = first.orchestrator.run(&event("v1.2.3", &[])).await.unwrap();
        assert_eq!(report.package.state, BranchState::Succeeded);
        let original = releases.stored("v1.2.3").unwrap();

        let report = second.orchestrator.run(&event("v1.2.3", &[])).await.unwrap();
        assert_eq!(report.package.state, BranchState::Failed);
        assert!(
            report
                .package
                .diagnostic
                .as_deref()
                .unwrap()
                .contains("already exists")
        );
        assert_eq!(releases.stored("v1.2.3").unwrap().id, original.id);
        assert_eq!(releases.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_partial_push_fails_image_branch() {
        let engine = FakeEngine::default().failing_push(
            "ghcr.io/org/pkg:0.2",
            PublishError::TransientNetwork("connection reset by peer".to_string()),
        );
        let h = harness(
            FakePackagePublisher::succeeding(),
            engine,
            settings(
                "org/pkg",
                TagConventions {
                    semver_variants: true,
                    latest: false,
                },
            ),
        );

        let report = h.orchestrator.run(&event("v0.2.3", &[])).await.unwrap();

        assert_eq!(report.image.state, BranchState::Failed);
        assert_eq!(report.package.state, BranchState::Succeeded);
        assert_eq!(report.status, RunStatus::PartiallySucceeded);
        assert_eq!(h.engine.push_attempts("ghcr.io/org/pkg:0.2"), 3);
        assert!(report.image.diagnostic.as_deref().unwrap().contains("0.2"));

        let BranchDetail::Image {
            push: Some(push), ..
        } = &report.image.detail
        else {
            panic!("image branch has no push report");
        };
        let tags: Vec<_> = push.pushes.iter().map(|p| p.tag.as_str()).collect();
        assert_eq!(tags, vec!["v0.2.3", "0.2.3", "0.2"]);
        assert!(push.pushes[0].is_pushed());
        assert!(push.pushes[1].is_pushed());
        assert!(matches!(
            push.pushes[2].outcome,
            TagOutcome::Failed { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_malformed_identity_fails_image_branch_only() {
        let h = harness(
            FakePackagePublisher::succeeding(),
            FakeEngine::default(),
            settings("not-an-identity", TagConventions::default()),
        );

        let report = h.orchestrator.run(&event("v1.0.0", &[])).await.unwrap();

        assert_eq!(report.image.state, BranchState::Failed);
        assert!(
            report
                .image
                .diagnostic
                .as_deref()
                .unwrap()
                .contains("malformed repository identity")
        );
        assert_eq!(h.engine.builds(), 0);
        assert_eq!(h.package.calls(), 1);
    }

    #[tokio::test]
    async fn test_panicking_branch_is_isolated() {
        let releases = InMemoryReleases::default();
        let settings = settings("org/pkg", TagConventions::default());
        let publishers = Publishers {
            package: Arc::new(FakePackagePublisher::succeeding()),
            release_notes: Arc::new(PlatformReleaseNotePublisher::new(
                releases.clone(),
                "org/pkg",
                RetryPolicy::none(),
            )),
            image: Arc::new(PanickingImagePublisher),
        };
        let orchestrator = Orchestrator::new(settings, publishers);

        let report = orchestrator.run(&event("v1.2.3", &[])).await.unwrap();

        assert_eq!(report.package.state, BranchState::Succeeded);
        assert_eq!(report.image.state, BranchState::Failed);
        assert!(
            report
                .image
                .diagnostic
                .as_deref()
                .unwrap()
                .contains("image publisher exploded")
        );
        assert_eq!(report.status, RunStatus::PartiallySucceeded);
        assert!(releases.stored("v1.2.3").is_some());
    }

    #[tokio::test]
    async fn test_panic_after_package_upload_warns_it_may_be_published() {
        let package = FakePackagePublisher::succeeding();
        let engine = FakeEngine::default();
        let settings = settings("org/pkg", TagConventions::default());
        let publishers = Publishers {
            package: Arc::new(package.clone()),
            release_notes: Arc::new(PanickingReleaseNotes),
            image: Arc::new(EngineImagePublisher::new(engine.clone(), RetryPolicy::none())),
        };
        let orchestrator = Orchestrator::new(settings, publishers);

        let report = orchestrator.run(&event("v1.2.3", &[])).await.unwrap();

        assert_eq!(package.calls(), 1);
        assert_eq!(report.package.state, BranchState::Failed);
        let diagnostic = report.package.diagnostic.as_deref().unwrap();
        assert!(diagnostic.contains("release notes exploded"));
        assert!(diagnostic.contains("the package may already be published"));
        assert_eq!(report.image.state, BranchState::Succeeded);
        assert!(report.image.diagnostic.is_none());
        assert_eq!(report.status, RunStatus::PartiallySucceeded);
    }

    #[tokio::test]
    async fn test_both_branches_failing() {
        let h = harness(
            FakePackagePublisher::panicking(),
            FakeEngine::default().failing_build(),
            settings("org/pkg", TagConventions::default()),
        );

        let report = h.orchestrator.run(&event("v1.2.3", &[])).await.unwrap();

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.status.exit_code(), 1);
        assert!(report.branches().iter().all(|b| b.state.is_terminal()));
    }

    #[tokio::test]
    async fn test_resolution_failure_publishes_nothing() {
        let h = harness(
            FakePackagePublisher::succeeding(),
            FakeEngine::default(),
            settings("org/pkg", TagConventions::default()),
        );

        let err = h
            .orchestrator
            .run(&event("refs/heads/main", &["v1.0.0"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ResolutionError::NotAVersionTag(_)));
        assert_eq!(h.package.calls(), 0);
        assert_eq!(h.engine.builds(), 0);
    }

    #[tokio::test]
    async fn test_manual_run_uses_newest_tag() {
        let h = harness(
            FakePackagePublisher::succeeding(),
            FakeEngine::default(),
            settings("org/pkg", TagConventions::default()),
        );

        let report = h
            .orchestrator
            .run(&EventContext::new(
                None,
                vec!["v0.9.0".to_string(), "v1.0.0".to_string()],
            ))
            .await
            .unwrap();

        assert_eq!(report.tag.as_str(), "v1.0.0");
        assert_eq!(report.previous_tag.as_ref().map(|t| t.as_str()), Some("v0.9.0"));
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::from_lookup(|key| match key {
            "SHIPWRIGHT_REPOSITORY" => Some("org/pkg".to_string()),
            "SHIPWRIGHT_WORKSPACE" => Some("/work".to_string()),
            "SHIPWRIGHT_CONTAINER_ENGINE" => Some("docker".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.image.engine, EngineKind::Docker);

        let settings = RunSettings::from_config(&config);
        assert_eq!(settings.manifest_path, PathBuf::from("/work/Cargo.toml"));
        assert_eq!(settings.recipe, PathBuf::from("/work/Containerfile"));
        assert_eq!(settings.credentials.username, "org");
        assert_eq!(settings.image_registry, "ghcr.io");
    }
}
