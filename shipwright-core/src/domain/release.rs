//! Release record domain types

use serde::{Deserialize, Serialize};

use super::tag::Tag;

/// A release entry on the hosting platform, created once per tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub tag: Tag,
    pub title: String,
    pub body: String,
    /// Platform-assigned identifier, when the platform returns one
    pub id: Option<u64>,
    pub url: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Receipt for a package pushed to the package registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReceipt {
    pub version: String,
    pub registry: Option<String>,
    pub attempts: u32,
    pub verification_skipped: bool,
}
