//! Releases repository
//!
//! Handles communication with the hosting platform for release records:
//! - Looking up the release of a tag
//! - Creating a release

use async_trait::async_trait;
use shipwright_client::{ClientError, CreateRelease, HostingClient, Release};

/// Repository trait for release records on the hosting platform
#[async_trait]
pub trait ReleaseRepository: Send + Sync {
    /// Finds the release attached to `tag`, if any
    async fn find_by_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<Option<Release>, ClientError>;

    /// Creates a release
    async fn create(
        &self,
        owner: &str,
        repo: &str,
        req: &CreateRelease,
    ) -> Result<Release, ClientError>;
}

/// HTTP implementation of ReleaseRepository
#[derive(Debug, Clone)]
pub struct HttpReleaseRepository {
    client: HostingClient,
}

impl HttpReleaseRepository {
    /// Creates a new HTTP release repository
    ///
    /// # Arguments
    /// * `client` - Hosting client configured with API URL and token
    pub fn new(client: HostingClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReleaseRepository for HttpReleaseRepository {
    async fn find_by_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<Option<Release>, ClientError> {
        self.client.get_release_by_tag(owner, repo, tag).await
    }

    async fn create(
        &self,
        owner: &str,
        repo: &str,
        req: &CreateRelease,
    ) -> Result<Release, ClientError> {
        self.client.create_release(owner, repo, req).await
    }
}
