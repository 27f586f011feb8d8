//! Release-related API endpoints

use tracing::debug;

use crate::HostingClient;
use crate::dto::{CreateRelease, Release};
use crate::error::{ClientError, Result};

impl HostingClient {
    // =============================================================================
    // Releases
    // =============================================================================

    /// Get the release attached to a tag
    ///
    /// # Returns
    /// `None` when the platform has no release for the tag
    pub async fn get_release_by_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<Option<Release>> {
        let url = format!(
            "{}/repos/{}/{}/releases/tags/{}",
            self.base_url, owner, repo, tag
        );
        debug!("GET {}", url);
        let response = self.client.get(&url).headers(self.headers()?).send().await?;

        match self.handle_response(response).await {
            Ok(release) => Ok(Some(release)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create a release
    ///
    /// # Arguments
    /// * `owner` / `repo` - Repository the release belongs to
    /// * `req` - Tag, title and body of the release
    pub async fn create_release(
        &self,
        owner: &str,
        repo: &str,
        req: &CreateRelease,
    ) -> Result<Release> {
        if req.tag_name.is_empty() {
            return Err(ClientError::InvalidRequest(
                "tag_name cannot be empty".to_string(),
            ));
        }

        let url = format!("{}/repos/{}/{}/releases", self.base_url, owner, repo);
        debug!("POST {} (tag {})", url, req.tag_name);
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(req)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
