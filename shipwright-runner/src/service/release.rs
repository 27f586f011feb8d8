//! Release note publisher
//!
//! Creates the release entry for a tag on the hosting platform. A tag that
//! already has a release is a hard failure; existing releases are never
//! updated in place.

use async_trait::async_trait;
use shipwright_client::{ClientError, CreateRelease, Release};
use shipwright_core::{PublishError, ReleaseRecord, RepositoryIdentity, Tag};
use tracing::{info, warn};

use crate::repository::ReleaseRepository;
use crate::retry::RetryPolicy;

/// Service trait for creating release records
#[async_trait]
pub trait ReleaseNotePublisher: Send + Sync {
    /// Creates the release for `tag`
    ///
    /// # Returns
    /// The created record, or `PublishError::DuplicateRelease` when the tag
    /// already has one
    async fn create_release(
        &self,
        tag: &Tag,
        title: &str,
        body: &str,
    ) -> Result<ReleaseRecord, PublishError>;
}

/// Title and body templates
///
/// Placeholders: `{tag}`, `{version}`, `{previous_tag}` (`none` for a first
/// release) and `{repository}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTemplate {
    pub title: String,
    pub body: String,
}

impl ReleaseTemplate {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Renders `(title, body)`
    pub fn render(&self, tag: &Tag, previous: Option<&Tag>, repository: &str) -> (String, String) {
        let fill = |template: &str| {
            template
                .replace("{tag}", tag.as_str())
                .replace("{version}", &tag.version().to_string())
                .replace(
                    "{previous_tag}",
                    previous.map(Tag::as_str).unwrap_or("none"),
                )
                .replace("{repository}", repository)
        };

        (fill(&self.title), fill(&self.body))
    }
}

/// [`ReleaseNotePublisher`] on top of a [`ReleaseRepository`]
#[derive(Debug, Clone)]
pub struct PlatformReleaseNotePublisher<R> {
    releases: R,
    repository: String,
    retry: RetryPolicy,
}

impl<R: ReleaseRepository> PlatformReleaseNotePublisher<R> {
    pub fn new(releases: R, repository: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            releases,
            repository: repository.into(),
            retry,
        }
    }
}

/// Maps a client failure to the publish error taxonomy
fn map_client_error(error: ClientError) -> PublishError {
    if error.is_auth_error() {
        PublishError::Credential(error.to_string())
    } else if error.is_transient() {
        PublishError::TransientNetwork(error.to_string())
    } else {
        PublishError::Rejected(error.to_string())
    }
}

fn into_record(release: Release, tag: &Tag, title: &str, body: &str) -> ReleaseRecord {
    ReleaseRecord {
        tag: tag.clone(),
        title: release.name.unwrap_or_else(|| title.to_string()),
        body: release.body.unwrap_or_else(|| body.to_string()),
        id: Some(release.id),
        url: release.html_url,
        created_at: release.created_at,
    }
}

#[async_trait]
impl<R: ReleaseRepository> ReleaseNotePublisher for PlatformReleaseNotePublisher<R> {
    async fn create_release(
        &self,
        tag: &Tag,
        title: &str,
        body: &str,
    ) -> Result<ReleaseRecord, PublishError> {
        let identity = RepositoryIdentity::parse(&self.repository)
            .map_err(|e| PublishError::Rejected(e.to_string()))?;
        let (owner, repo) = (identity.owner.as_str(), identity.name.as_str());

        let existing = self
            .retry
            .run("release lookup", move || async move {
                self.releases
                    .find_by_tag(owner, repo, tag.as_str())
                    .await
                    .map_err(map_client_error)
            })
            .await
            .result?;

        if let Some(release) = existing {
            warn!(
                "Release {} already exists for {} ({}), refusing to overwrite",
                release.id, tag, identity
            );
            return Err(PublishError::DuplicateRelease {
                tag: tag.to_string(),
            });
        }

        let request = CreateRelease {
            tag_name: tag.to_string(),
            name: title.to_string(),
            body: body.to_string(),
            draft: false,
            prerelease: tag.is_prerelease(),
        };

        let request = &request;
        let retried = self
            .retry
            .run("create release", move || async move {
                self.releases
                    .create(owner, repo, request)
                    .await
                    .map_err(|e| {
                        if e.is_already_exists() {
                            PublishError::DuplicateRelease {
                                tag: tag.to_string(),
                            }
                        } else {
                            map_client_error(e)
                        }
                    })
            })
            .await;
        let release = retried.result?;

        info!("Created release {} for {} in {}", release.id, tag, identity);
        Ok(into_record(release, tag, title, body))
    }
}
