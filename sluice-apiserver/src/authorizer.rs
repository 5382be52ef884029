//! Authorization Backend
//!
//! Contract for the external permission-check service and its HTTP client.
//! The backend decides; this module only builds the request and interprets
//! the answer.

use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API group of pipeline resources
pub const RBAC_PIPELINES_GROUP: &str = "pipelines.sluice.dev";
/// API version of pipeline resources
pub const RBAC_PIPELINES_VERSION: &str = "v1beta1";
/// Resource kind of pipelines
pub const RBAC_RESOURCE_TYPE_PIPELINES: &str = "pipelines";

/// Action being authorized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    #[default]
    Create,
    List,
}

/// What is being accessed, built fresh for every request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttributes {
    pub namespace: String,
    pub verb: Verb,
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl ResourceAttributes {
    pub fn new(namespace: impl Into<String>, verb: Verb) -> Self {
        Self {
            namespace: namespace.into(),
            verb,
            ..Default::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthorizerError {
    #[error("access denied: {0}")]
    Denied(String),

    #[error("authorization request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authorization backend returned status {0}")]
    Status(u16),

    #[error("header '{0}' is not valid UTF-8 and cannot be forwarded")]
    InvalidHeader(String),
}

/// External decision call
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Succeeds only if the caller identified by `metadata` may perform
    /// `attributes`
    async fn authorize(
        &self,
        metadata: &HeaderMap,
        attributes: &ResourceAttributes,
    ) -> Result<(), AuthorizerError>;
}

/// Used by single-user deployments, where no check is ever requested
#[derive(Debug, Clone, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(
        &self,
        _metadata: &HeaderMap,
        _attributes: &ResourceAttributes,
    ) -> Result<(), AuthorizerError> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct AccessReview<'a> {
    resource_attributes: &'a ResourceAttributes,
    metadata: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct AccessReviewStatus {
    allowed: bool,
    #[serde(default)]
    reason: String,
}

/// Client for an HTTP decision endpoint
///
/// Posts `{resource_attributes, metadata}` and expects `{allowed, reason}`.
#[derive(Debug, Clone)]
pub struct HttpAuthorizer {
    url: String,
    client: reqwest::Client,
}

impl HttpAuthorizer {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

/// Every inbound header, by name, with all of its values
///
/// Values are forwarded verbatim, so a value that is not valid UTF-8 is
/// rejected instead of being rewritten.
pub fn header_metadata(
    headers: &HeaderMap,
) -> Result<BTreeMap<String, Vec<String>>, AuthorizerError> {
    let mut metadata: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        let value = std::str::from_utf8(value.as_bytes())
            .map_err(|_| AuthorizerError::InvalidHeader(name.as_str().to_string()))?;
        metadata
            .entry(name.as_str().to_string())
            .or_default()
            .push(value.to_string());
    }
    Ok(metadata)
}

#[async_trait]
impl Authorizer for HttpAuthorizer {
    async fn authorize(
        &self,
        metadata: &HeaderMap,
        attributes: &ResourceAttributes,
    ) -> Result<(), AuthorizerError> {
        let review = AccessReview {
            resource_attributes: attributes,
            metadata: header_metadata(metadata)?,
        };

        let response = self.client.post(&self.url).json(&review).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthorizerError::Status(status.as_u16()));
        }

        let decision: AccessReviewStatus = response.json().await?;
        if decision.allowed {
            Ok(())
        } else {
            Err(AuthorizerError::Denied(decision.reason))
        }
    }
}
