//! Shipwright Hosting Client
//!
//! A small, type-safe HTTP client for the hosting platform's release API
//! (GitHub-compatible REST).
//!
//! # Example
//!
//! ```no_run
//! use shipwright_client::{CreateRelease, HostingClient};
//! use shipwright_core::Secret;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HostingClient::new("https://api.github.com", Secret::new("token"));
//!
//!     let release = client
//!         .create_release("org", "pkg", &CreateRelease {
//!             tag_name: "v1.2.3".to_string(),
//!             name: "v1.2.3".to_string(),
//!             body: "Release notes".to_string(),
//!             draft: false,
//!             prerelease: false,
//!         })
//!         .await?;
//!
//!     println!("Created release {}", release.id);
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
mod releases;

pub use dto::{CreateRelease, Release};
pub use error::{ClientError, Result};

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use shipwright_core::Secret;

const DEFAULT_USER_AGENT: &str = concat!("shipwright/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the hosting platform API
#[derive(Debug, Clone)]
pub struct HostingClient {
    /// Base URL of the API (e.g., "https://api.github.com")
    base_url: String,
    /// Token sent as a bearer credential
    token: Secret,
    /// HTTP client instance
    client: Client,
}

impl HostingClient {
    /// Create a new hosting client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API (e.g., "https://api.github.com")
    /// * `token` - Platform token; an empty token sends unauthenticated requests
    pub fn new(base_url: impl Into<String>, token: Secret) -> Self {
        Self::with_client(base_url, token, Client::new())
    }

    /// Create a new hosting client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, token: Secret, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        }
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers sent with every request
    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        if !self.token.is_empty() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token.expose()))
                .map_err(|_| ClientError::InvalidRequest("token is not a valid header value".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
