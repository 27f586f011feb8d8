//! Version tag domain type

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ResolutionError;

const TAG_REF_PREFIX: &str = "refs/tags/";

/// An immutable `vMAJOR.MINOR.PATCH` tag
///
/// Pre-release and build suffixes allowed by semantic versioning are kept
/// (`v1.2.3-rc.1`), leading zeros and missing components are not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag {
    name: String,
    version: semver::Version,
}

impl Tag {
    /// Parses a bare tag name or a `refs/tags/<name>` ref
    pub fn parse(input: &str) -> Result<Self, ResolutionError> {
        let name = input.trim();
        let name = name.strip_prefix(TAG_REF_PREFIX).unwrap_or(name);

        let version = name
            .strip_prefix('v')
            .and_then(|rest| semver::Version::parse(rest).ok())
            .ok_or_else(|| ResolutionError::NotAVersionTag(input.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }

    /// The tag exactly as it appears in the repository (`v1.2.3`)
    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &semver::Version {
        &self.version
    }

    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl TryFrom<String> for Tag {
    type Error = ResolutionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Tag::parse(&value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.name
    }
}
