//! Container image domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tags and labels to attach to a built image
///
/// `tags` are reference suffixes (`v1.2.3`, `latest`) in push order;
/// `labels` are OCI annotation key/value pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub tags: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

impl ImageMetadata {
    /// Full `repository:tag` references for every tag
    pub fn references(&self, repository: &str) -> Vec<String> {
        self.tags
            .iter()
            .map(|tag| format!("{}:{}", repository, tag))
            .collect()
    }
}

/// Checks a tag against the image reference grammar
///
/// `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`
pub fn is_valid_image_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    tag.len() <= 128
        && (first.is_ascii_alphanumeric() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Result of pushing a single image tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TagOutcome {
    Pushed { attempts: u32 },
    Failed { kind: String, error: String, attempts: u32 },
}

/// Push record for one tag of the image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPush {
    pub tag: String,
    pub reference: String,
    pub outcome: TagOutcome,
}

impl TagPush {
    pub fn is_pushed(&self) -> bool {
        matches!(self.outcome, TagOutcome::Pushed { .. })
    }
}

/// Per-tag outcome of an image build-and-push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePushReport {
    pub repository: String,
    pub pushes: Vec<TagPush>,
}

impl ImagePushReport {
    pub fn all_pushed(&self) -> bool {
        self.pushes.iter().all(TagPush::is_pushed)
    }

    /// Tags that did not reach the registry
    pub fn failed_tags(&self) -> Vec<&str> {
        self.pushes
            .iter()
            .filter(|push| !push.is_pushed())
            .map(|push| push.tag.as_str())
            .collect()
    }
}
