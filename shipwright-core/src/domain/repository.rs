//! Repository identity domain type

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MetadataError;

/// Canonical `owner/name` of the artifact and image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub name: String,
}

impl RepositoryIdentity {
    /// Parses an `owner/name` pair
    ///
    /// Both segments must be non-empty and contain only ASCII alphanumerics,
    /// `-`, `_` or `.`.
    pub fn parse(input: &str) -> Result<Self, MetadataError> {
        let (owner, name) = input
            .split_once('/')
            .ok_or_else(|| MetadataError::malformed(input, "expected owner/name"))?;

        if name.contains('/') {
            return Err(MetadataError::malformed(input, "more than one `/`"));
        }

        for (label, segment) in [("owner", owner), ("name", name)] {
            if segment.is_empty() {
                return Err(MetadataError::malformed(input, format!("{} is empty", label)));
            }
            if segment.starts_with('.') || segment.starts_with('-') {
                return Err(MetadataError::malformed(
                    input,
                    format!("{} must start with a letter, digit or `_`", label),
                ));
            }
            if let Some(bad) = segment
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            {
                return Err(MetadataError::malformed(
                    input,
                    format!("{} contains invalid character `{}`", label, bad),
                ));
            }
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Lowercased `owner/name`, as image registries require
    pub fn image_path(&self) -> String {
        format!("{}/{}", self.owner, self.name).to_ascii_lowercase()
    }

    /// Browsable URL of the repository on the given web host
    pub fn web_url(&self, web_base: &str) -> String {
        format!("{}/{}/{}", web_base.trim_end_matches('/'), self.owner, self.name)
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_identity() {
        let identity = RepositoryIdentity::parse("Org/my_pkg.rs").unwrap();
        assert_eq!(identity.owner, "Org");
        assert_eq!(identity.name, "my_pkg.rs");
        assert_eq!(identity.to_string(), "Org/my_pkg.rs");
        assert_eq!(identity.image_path(), "org/my_pkg.rs");
    }

    #[test]
    fn test_web_url_trims_slash() {
        let identity = RepositoryIdentity::parse("org/pkg").unwrap();
        assert_eq!(
            identity.web_url("https://github.com/"),
            "https://github.com/org/pkg"
        );
    }

    #[test]
    fn test_rejects_malformed_identity() {
        for input in ["", "org", "org/", "/pkg", "org/pkg/extra", "org/p kg", "-org/pkg", "org/.pkg"] {
            let err = RepositoryIdentity::parse(input).unwrap_err();
            assert!(
                matches!(err, MetadataError::MalformedIdentity { ref identity, .. } if identity == input),
                "{} should be rejected, got {:?}",
                input,
                err
            );
        }
    }
}
