//! Error taxonomy for release runs
//!
//! - `ResolutionError` aborts the whole run before any branch starts.
//! - `MetadataError` aborts the image branch only.
//! - `PublishError` covers every registry/platform failure inside a branch.

use thiserror::Error;

/// No usable version tag could be determined for the run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The triggering ref does not name a `vMAJOR.MINOR.PATCH` tag
    #[error("ref `{0}` is not a version tag (expected vMAJOR.MINOR.PATCH)")]
    NotAVersionTag(String),

    /// No ref was supplied and the tag history holds no version tag
    #[error("no version tag found in event or tag history")]
    NoVersionTag,
}

/// Repository identity could not be turned into image metadata
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// Identity is not a valid `owner/name` pair
    #[error("malformed repository identity `{identity}`: {reason}")]
    MalformedIdentity { identity: String, reason: String },
}

impl MetadataError {
    pub fn malformed(identity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedIdentity {
            identity: identity.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a publish step (package registry, hosting platform or image registry)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The package registry already holds this version
    #[error("version {version} is already published")]
    DuplicateVersion { version: String },

    /// Credentials were rejected
    #[error("credential error: {0}")]
    Credential(String),

    /// The registry or platform refused the request for a non-retriable reason
    #[error("rejected: {0}")]
    Rejected(String),

    /// Network-level failure that may succeed on retry
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// A release already exists for the tag
    #[error("a release already exists for tag {tag}")]
    DuplicateRelease { tag: String },

    /// The container image could not be built
    #[error("image build failed: {0}")]
    BuildFailed(String),

    /// An external tool could not be started or behaved unexpectedly
    #[error("tool error: {0}")]
    Tool(String),
}

impl PublishError {
    /// Whether a retry within the same branch may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork(_))
    }

    /// Stable identifier used in run reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateVersion { .. } => "duplicate_version",
            Self::Credential(_) => "credential",
            Self::Rejected(_) => "rejected",
            Self::TransientNetwork(_) => "transient_network",
            Self::DuplicateRelease { .. } => "duplicate_release",
            Self::BuildFailed(_) => "build_failed",
            Self::Tool(_) => "tool",
        }
    }
}
