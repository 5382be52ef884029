//! Sluice HTTP Client
//!
//! A type-safe HTTP client for the Sluice pipeline upload and list API.
//!
//! # Example
//!
//! ```no_run
//! use sluice_client::ApiServerClient;
//! use sluice_core::dto::pipeline::UploadPipelineQuery;
//!
//! #[tokio::main]
//! async fn main() -> sluice_client::Result<()> {
//!     let client = ApiServerClient::new("http://localhost:8888");
//!
//!     let params = UploadPipelineQuery {
//!         namespace: Some("team-a".to_string()),
//!         ..Default::default()
//!     };
//!     let pipeline = client
//!         .upload_pipeline("pipeline.yaml", b"name: demo".to_vec(), &params)
//!         .await?;
//!
//!     println!("Created pipeline: {}", pipeline.id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod pipelines;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;
use sluice_core::dto::error::ErrorBody;

/// HTTP client for the Sluice API server
#[derive(Debug, Clone)]
pub struct ApiServerClient {
    /// Base URL of the API server (e.g., "http://localhost:8888")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ApiServerClient {
    /// Create a new API server client
    ///
    /// # Example
    /// ```
    /// use sluice_client::ApiServerClient;
    ///
    /// let client = ApiServerClient::new("http://localhost:8888");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new API server client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the API server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body, decoding the
    /// server's error body on failure
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            tracing::debug!("Request failed with status {}: {}", status, error_text);

            return Err(match serde_json::from_str::<ErrorBody>(&error_text) {
                Ok(body) => {
                    ClientError::api_error(status.as_u16(), body.error_message, body.error_details)
                }
                Err(_) => ClientError::api_error(status.as_u16(), error_text, String::new()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
