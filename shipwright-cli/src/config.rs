//! Configuration module
//!
//! Handles CLI configuration shared by every command.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Hosting platform REST API base
    pub api_url: String,
    /// Hosting platform web base, used for source labels
    pub web_url: String,
}
