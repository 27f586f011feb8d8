//! Image metadata derivation
//!
//! Computes the image tags and OCI labels for a release from the repository
//! identity and the resolved tag. The deriver only holds configuration fixed
//! at run start, so the same inputs always give the same metadata.

use std::collections::BTreeMap;

use crate::domain::image::{ImageMetadata, is_valid_image_tag};
use crate::domain::repository::RepositoryIdentity;
use crate::domain::tag::Tag;
use crate::error::MetadataError;

pub const LABEL_SOURCE: &str = "org.opencontainers.image.source";
pub const LABEL_URL: &str = "org.opencontainers.image.url";
pub const LABEL_TITLE: &str = "org.opencontainers.image.title";
pub const LABEL_VERSION: &str = "org.opencontainers.image.version";
pub const LABEL_REVISION: &str = "org.opencontainers.image.revision";
pub const LABEL_CREATED: &str = "org.opencontainers.image.created";

const MAX_IMAGE_TAG_LEN: usize = 128;

/// Which extra image tags to emit besides the release tag itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagConventions {
    /// `1.2.3`, `1.2` and `1` (major skipped while it is 0)
    pub semver_variants: bool,
    /// `latest`
    pub latest: bool,
}

/// Derives [`ImageMetadata`] for a release
#[derive(Debug, Clone)]
pub struct MetadataDeriver {
    web_base: String,
    conventions: TagConventions,
    revision: Option<String>,
    source_date_epoch: Option<i64>,
}

impl MetadataDeriver {
    /// Creates a deriver for repositories hosted under `web_base` (e.g. "https://github.com")
    pub fn new(web_base: impl Into<String>) -> Self {
        Self {
            web_base: web_base.into(),
            conventions: TagConventions::default(),
            revision: None,
            source_date_epoch: None,
        }
    }

    pub fn with_conventions(mut self, conventions: TagConventions) -> Self {
        self.conventions = conventions;
        self
    }

    /// Commit the release was built from
    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    /// Fixed build time, as in the `SOURCE_DATE_EPOCH` convention
    pub fn with_source_date_epoch(mut self, epoch: Option<i64>) -> Self {
        self.source_date_epoch = epoch;
        self
    }

    /// Derives image tags and labels
    ///
    /// The first tag is always the release tag, cut down to the image tag
    /// grammar when needed. Fails only when `identity` is not a valid
    /// `owner/name`.
    pub fn derive(&self, identity: &str, tag: &Tag) -> Result<ImageMetadata, MetadataError> {
        let repository = RepositoryIdentity::parse(identity)?;

        let tags = self.image_tags(tag);

        let url = repository.web_url(&self.web_base);
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_SOURCE.to_string(), url.clone());
        labels.insert(LABEL_URL.to_string(), url);
        labels.insert(LABEL_TITLE.to_string(), repository.name.clone());
        labels.insert(LABEL_VERSION.to_string(), tag.version().to_string());
        labels.insert(
            LABEL_REVISION.to_string(),
            self.revision
                .clone()
                .unwrap_or_else(|| tag.as_str().to_string()),
        );

        if let Some(created) = self
            .source_date_epoch
            .and_then(|epoch| chrono::DateTime::from_timestamp(epoch, 0))
        {
            labels.insert(
                LABEL_CREATED.to_string(),
                created.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            );
        }

        Ok(ImageMetadata { tags, labels })
    }

    fn image_tags(&self, tag: &Tag) -> Vec<String> {
        // `+` (build metadata) is not allowed in image tags
        let mut primary = tag.as_str().replace('+', "-");
        primary.truncate(MAX_IMAGE_TAG_LEN);
        let mut tags = vec![primary];

        if !tag.is_prerelease() {
            let version = tag.version();
            if self.conventions.semver_variants {
                tags.push(format!(
                    "{}.{}.{}",
                    version.major, version.minor, version.patch
                ));
                tags.push(format!("{}.{}", version.major, version.minor));
                if version.major != 0 {
                    tags.push(version.major.to_string());
                }
            }
            if self.conventions.latest {
                tags.push("latest".to_string());
            }
        }

        let mut seen = std::collections::HashSet::new();
        tags.retain(|t| is_valid_image_tag(t) && seen.insert(t.clone()));
        tags
    }
}
