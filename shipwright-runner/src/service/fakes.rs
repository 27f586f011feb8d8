//! In-memory collaborators for tests

use async_trait::async_trait;
use shipwright_client::{ClientError, CreateRelease, Release};
use shipwright_core::domain::image::ImagePushReport;
use shipwright_core::domain::release::PackageReceipt;
use shipwright_core::{ImageMetadata, PublishError, ReleaseRecord, Secret, Tag};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::image::{BuildContext, ImagePublisher, RegistryCredentials};
use super::package::{ArtifactContext, PackagePublisher};
use super::release::ReleaseNotePublisher;
use crate::engine::{BuildRequest, ContainerEngine};
use crate::repository::ReleaseRepository;

#[derive(Debug, Clone)]
enum Behavior {
    Succeed,
    Fail(PublishError),
    Panic,
}

/// Package publisher with a fixed outcome
#[derive(Debug, Clone)]
pub struct FakePackagePublisher {
    behavior: Behavior,
    calls: Arc<AtomicU32>,
}

impl FakePackagePublisher {
    pub fn succeeding() -> Self {
        Self {
            behavior: Behavior::Succeed,
            calls: Arc::default(),
        }
    }

    pub fn failing(error: PublishError) -> Self {
        Self {
            behavior: Behavior::Fail(error),
            calls: Arc::default(),
        }
    }

    pub fn panicking() -> Self {
        Self {
            behavior: Behavior::Panic,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackagePublisher for FakePackagePublisher {
    async fn publish(
        &self,
        artifact: &ArtifactContext,
        _token: &Secret,
    ) -> Result<PackageReceipt, PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed => Ok(PackageReceipt {
                version: artifact.version.version().to_string(),
                registry: None,
                attempts: 1,
                verification_skipped: false,
            }),
            Behavior::Fail(e) => Err(e.clone()),
            Behavior::Panic => panic!("package publisher exploded"),
        }
    }
}

/// Image publisher that panics mid-branch
#[derive(Debug, Clone, Default)]
pub struct PanickingImagePublisher;

#[async_trait]
impl ImagePublisher for PanickingImagePublisher {
    async fn build_and_push(
        &self,
        _context: &BuildContext,
        _metadata: &ImageMetadata,
        _credentials: &RegistryCredentials,
    ) -> Result<ImagePushReport, PublishError> {
        panic!("image publisher exploded")
    }
}

/// Release note publisher that panics once the package is out
#[derive(Debug, Clone, Default)]
pub struct PanickingReleaseNotes;

#[async_trait]
impl ReleaseNotePublisher for PanickingReleaseNotes {
    async fn create_release(
        &self,
        _tag: &Tag,
        _title: &str,
        _body: &str,
    ) -> Result<ReleaseRecord, PublishError> {
        panic!("release notes exploded")
    }
}

#[derive(Debug, Default)]
struct ReleasesState {
    releases: BTreeMap<String, Release>,
    next_id: u64,
    lookup_calls: u32,
    create_calls: u32,
    hide_lookups: bool,
    transient_failures: u32,
    auth_failure: bool,
}

/// Hosting platform release store
#[derive(Debug, Clone, Default)]
pub struct InMemoryReleases {
    state: Arc<Mutex<ReleasesState>>,
}

impl InMemoryReleases {
    /// Lookups always miss, as if the release appeared between lookup and create
    pub fn with_hidden_lookups(self) -> Self {
        self.state.lock().unwrap().hide_lookups = true;
        self
    }

    /// The first `count` lookups answer 503
    pub fn with_transient_failures(self, count: u32) -> Self {
        self.state.lock().unwrap().transient_failures = count;
        self
    }

    /// Every request answers 401
    pub fn with_auth_failure(self) -> Self {
        self.state.lock().unwrap().auth_failure = true;
        self
    }

    pub fn stored(&self, tag: &str) -> Option<Release> {
        self.state.lock().unwrap().releases.get(tag).cloned()
    }

    pub fn lookup_calls(&self) -> u32 {
        self.state.lock().unwrap().lookup_calls
    }

    pub fn create_calls(&self) -> u32 {
        self.state.lock().unwrap().create_calls
    }
}

#[async_trait]
impl ReleaseRepository for InMemoryReleases {
    async fn find_by_tag(
        &self,
        _owner: &str,
        _repo: &str,
        tag: &str,
    ) -> Result<Option<Release>, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.lookup_calls += 1;

        if state.auth_failure {
            return Err(ClientError::api_error(401, "Bad credentials"));
        }
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(ClientError::api_error(503, "Service Unavailable"));
        }
        if state.hide_lookups {
            return Ok(None);
        }

        Ok(state.releases.get(tag).cloned())
    }

    async fn create(
        &self,
        owner: &str,
        repo: &str,
        req: &CreateRelease,
    ) -> Result<Release, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;

        if state.releases.contains_key(&req.tag_name) {
            return Err(ClientError::api_error(
                422,
                r#"Validation Failed: {"resource":"Release","code":"already_exists","field":"tag_name"}"#,
            ));
        }

        state.next_id += 1;
        let release = Release {
            id: state.next_id,
            tag_name: req.tag_name.clone(),
            name: Some(req.name.clone()),
            body: Some(req.body.clone()),
            html_url: Some(format!(
                "https://github.com/{}/{}/releases/tag/{}",
                owner, repo, req.tag_name
            )),
            created_at: Some(chrono::Utc::now()),
            draft: req.draft,
            prerelease: req.prerelease,
        };
        state.releases.insert(req.tag_name.clone(), release.clone());
        Ok(release)
    }
}

#[derive(Debug, Default)]
struct EngineState {
    build_fails: bool,
    push_failures: HashMap<String, PublishError>,
    logins: u32,
    builds: Vec<BuildRequest>,
    push_attempts: HashMap<String, u32>,
}

/// Container engine recording every call
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    pub fn failing_build(self) -> Self {
        self.state.lock().unwrap().build_fails = true;
        self
    }

    /// Every push of `reference` fails with `error`
    pub fn failing_push(self, reference: &str, error: PublishError) -> Self {
        self.state
            .lock()
            .unwrap()
            .push_failures
            .insert(reference.to_string(), error);
        self
    }

    pub fn logins(&self) -> u32 {
        self.state.lock().unwrap().logins
    }

    pub fn builds(&self) -> usize {
        self.state.lock().unwrap().builds.len()
    }

    /// References passed to the last build
    pub fn built_references(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .builds
            .last()
            .map(|b| b.references.clone())
            .unwrap_or_default()
    }

    pub fn push_attempts(&self, reference: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .push_attempts
            .get(reference)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn check_available(&self) -> Result<(), PublishError> {
        Ok(())
    }

    async fn login(
        &self,
        _registry: &str,
        _username: &str,
        _token: &Secret,
    ) -> Result<(), PublishError> {
        self.state.lock().unwrap().logins += 1;
        Ok(())
    }

    async fn build(&self, request: &BuildRequest) -> Result<(), PublishError> {
        let mut state = self.state.lock().unwrap();
        state.builds.push(request.clone());
        if state.build_fails {
            return Err(PublishError::BuildFailed(
                "exit_code=125: Containerfile not found".to_string(),
            ));
        }
        Ok(())
    }

    async fn push(&self, reference: &str) -> Result<(), PublishError> {
        let mut state = self.state.lock().unwrap();
        *state.push_attempts.entry(reference.to_string()).or_default() += 1;
        match state.push_failures.get(reference) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
