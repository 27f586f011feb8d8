//! Tag resolution
//!
//! Determines the tag that triggered a run and the tag released before it.
//! Pure lookup over the event context; reading the tag history from git is
//! the caller's job.

use serde::{Deserialize, Serialize};

use crate::domain::tag::Tag;
use crate::error::ResolutionError;

/// What the triggering event tells us
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Pushed ref (`refs/tags/v1.2.3` or `v1.2.3`); absent for manual runs
    pub git_ref: Option<String>,
    /// Tag names in chronological order, oldest first
    pub history: Vec<String>,
}

impl EventContext {
    pub fn new(git_ref: Option<String>, history: Vec<String>) -> Self {
        Self { git_ref, history }
    }
}

/// Current and previous tag of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTags {
    pub current: Tag,
    /// `None` for the first release
    pub previous: Option<Tag>,
}

/// Splits `git tag --list` output into tag names, keeping their order
pub fn parse_tag_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TagResolver;

impl TagResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolves `(current, previous)` from the event
    ///
    /// With a ref, `current` is that ref and it must be a version tag. Without
    /// one, `current` is the newest version tag in the history. Non-version
    /// entries in the history are skipped.
    pub fn resolve(&self, event: &EventContext) -> Result<ResolvedTags, ResolutionError> {
        let history: Vec<Tag> = event
            .history
            .iter()
            .filter_map(|name| Tag::parse(name).ok())
            .collect();

        let current = match event.git_ref.as_deref() {
            Some(git_ref) => Tag::parse(git_ref)?,
            None => history
                .last()
                .cloned()
                .ok_or(ResolutionError::NoVersionTag)?,
        };

        let previous = match history.iter().position(|tag| tag == &current) {
            Some(idx) => idx.checked_sub(1).and_then(|prev| history.get(prev)).cloned(),
            None => history.iter().rev().find(|tag| *tag != &current).cloned(),
        };

        Ok(ResolvedTags { current, previous })
    }
}
