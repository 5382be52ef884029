//! Pipeline Service
//!
//! Creation delegate: assembles the construction parameters for pipelines and
//! versions and hands them to the resource manager. Persistence failures are
//! reported as internal errors and never retried.

use sluice_core::domain::pipeline::{Pipeline, PipelineVersion, ResourceReference};
use sluice_core::dto::pipeline::{NewPipeline, NewPipelineVersion};

use crate::api::error::{ApiError, ErrorKind};
use crate::repository::{ResourceError, ResourceManager};

fn internal(err: ResourceError) -> ApiError {
    ErrorKind::Internal
        .with_message(err.to_string())
        .with_source(err)
}

/// Create a pipeline (and its first version) from an uploaded artifact
pub async fn create_pipeline(
    resources: &dyn ResourceManager,
    name: String,
    description: String,
    namespace: String,
    artifact: Vec<u8>,
) -> Result<Pipeline, ApiError> {
    let req = NewPipeline {
        name,
        description,
        namespace,
    };

    let pipeline = resources
        .create_pipeline(req, artifact)
        .await
        .map_err(|e| internal(e).wrap("Error creating pipeline"))?;

    tracing::info!("Pipeline created: {} ({})", pipeline.name, pipeline.id);

    Ok(pipeline)
}

/// Create a version owned by `pipeline_id`
pub async fn create_pipeline_version(
    resources: &dyn ResourceManager,
    name: String,
    description: String,
    pipeline_id: &str,
    artifact: Vec<u8>,
    auto_update_default: bool,
) -> Result<PipelineVersion, ApiError> {
    let req = version_request(name, description, pipeline_id);

    resources
        .create_pipeline_version(req, artifact, auto_update_default)
        .await
        .map_err(|e| internal(e).wrap("Error creating pipeline version"))
}

fn version_request(name: String, description: String, pipeline_id: &str) -> NewPipelineVersion {
    NewPipelineVersion {
        name,
        description,
        resource_references: vec![ResourceReference::pipeline_owner(pipeline_id)],
    }
}
