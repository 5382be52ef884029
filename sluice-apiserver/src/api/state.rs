//! Shared application state for API handlers.

use std::sync::Arc;

use crate::authorizer::Authorizer;
use crate::config::Config;
use crate::repository::ResourceManager;
use crate::service::authorization::AuthorizationGate;
use crate::service::counters::UploadCounters;

/// Per-deployment switches read by the upload path
#[derive(Debug, Clone, Copy)]
pub struct UploadOptions {
    pub multi_user: bool,
    pub max_upload_bytes: usize,
    pub auto_update_default_version: bool,
}

impl From<&Config> for UploadOptions {
    fn from(config: &Config) -> Self {
        Self {
            multi_user: config.multi_user,
            max_upload_bytes: config.max_upload_bytes,
            auto_update_default_version: config.auto_update_default_version,
        }
    }
}

/// Shared application state passed to all handlers.
///
/// Nothing in here is mutated per request except the atomic counters.
#[derive(Clone)]
pub struct AppState {
    /// Persistence and lookup of pipelines.
    pub resources: Arc<dyn ResourceManager>,
    /// External permission check.
    pub authorizer: Arc<dyn Authorizer>,
    /// Upload path switches.
    pub options: UploadOptions,
    /// Process-wide upload request totals.
    pub counters: Arc<UploadCounters>,
}

impl AppState {
    pub fn new(
        options: UploadOptions,
        resources: Arc<dyn ResourceManager>,
        authorizer: Arc<dyn Authorizer>,
        counters: Arc<UploadCounters>,
    ) -> Self {
        Self {
            resources,
            authorizer,
            options,
            counters,
        }
    }

    pub fn gate(&self) -> AuthorizationGate<'_> {
        AuthorizationGate::new(
            self.options.multi_user,
            self.resources.as_ref(),
            self.authorizer.as_ref(),
        )
    }
}
