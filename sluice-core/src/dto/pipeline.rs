//! Pipeline DTOs

use serde::{Deserialize, Serialize};

use crate::domain::pipeline::{Pipeline, ResourceReference};

/// Form field carrying the uploaded pipeline file
pub const UPLOAD_FILE_FIELD: &str = "uploadfile";

/// Construction parameters for a new pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPipeline {
    pub name: String,
    pub description: String,
    /// Empty for cluster-scoped pipelines
    pub namespace: String,
}

/// Construction parameters for a new pipeline version
///
/// `resource_references` must contain the owner edge to the parent pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPipelineVersion {
    pub name: String,
    pub description: String,
    pub resource_references: Vec<ResourceReference>,
}

/// Query parameters accepted by the pipeline upload endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadPipelineQuery {
    pub name: Option<String>,
    pub description: Option<String>,
    pub namespace: Option<String>,
}

/// Query parameters accepted by the pipeline version upload endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadPipelineVersionQuery {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "pipelineid")]
    pub pipeline_id: Option<String>,
}

/// Query parameters accepted by the pipeline list endpoint
///
/// `filter` is the JSON encoding of a [`crate::domain::filter::Filter`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPipelinesQuery {
    pub namespace: Option<String>,
    pub filter: Option<String>,
}

/// Response of the pipeline list endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPipelinesResponse {
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
    #[serde(default)]
    pub total_size: usize,
}
