//! Repository Module
//!
//! Data access layer for the API server. [`ResourceManager`] is the narrow
//! contract the upload and list paths consume; [`PgResourceManager`] backs it
//! with Postgres.

pub mod filter;
pub mod pipeline;

use async_trait::async_trait;
use sluice_core::domain::filter::Filter;
use sluice_core::domain::pipeline::{Pipeline, PipelineVersion};
use sluice_core::dto::pipeline::{NewPipeline, NewPipelineVersion};
use thiserror::Error;

pub use pipeline::PgResourceManager;

/// Resource manager error type
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence and lookup of pipelines and their versions
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// Persist a pipeline together with its first version
    async fn create_pipeline(
        &self,
        pipeline: NewPipeline,
        artifact: Vec<u8>,
    ) -> Result<Pipeline, ResourceError>;

    /// Persist a version under the pipeline named by its owner reference
    async fn create_pipeline_version(
        &self,
        version: NewPipelineVersion,
        artifact: Vec<u8>,
        auto_update_default: bool,
    ) -> Result<PipelineVersion, ResourceError>;

    /// Namespace of an existing pipeline; empty when cluster-scoped
    async fn namespace_of_pipeline(&self, pipeline_id: &str) -> Result<String, ResourceError>;

    /// Pipelines in `namespace` matching every predicate of `filter`
    async fn list_pipelines(
        &self,
        namespace: &str,
        filter: &Filter,
    ) -> Result<Vec<Pipeline>, ResourceError>;
}
