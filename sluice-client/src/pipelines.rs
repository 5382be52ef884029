//! Pipeline-related API endpoints
//!
//! The server unescapes `name`, `description` and `namespace` once more after
//! transport decoding, so those values are escaped here before they are
//! placed in the query string.

use reqwest::multipart::{Form, Part};
use sluice_core::domain::filter::Filter;
use sluice_core::domain::pipeline::{Pipeline, PipelineVersion};
use sluice_core::dto::pipeline::{
    ListPipelinesResponse, UPLOAD_FILE_FIELD, UploadPipelineQuery, UploadPipelineVersionQuery,
};

use crate::ApiServerClient;
use crate::error::{ClientError, Result};

const UPLOAD_PATH: &str = "/apis/v1beta1/pipelines/upload";
const UPLOAD_VERSION_PATH: &str = "/apis/v1beta1/pipelines/upload_version";
const LIST_PATH: &str = "/apis/v1beta1/pipelines";

fn escaped(key: &'static str, value: &Option<String>) -> Option<(&'static str, String)> {
    value
        .as_deref()
        .map(|v| (key, urlencoding::encode(v).into_owned()))
}

fn upload_form(file_name: &str, contents: Vec<u8>) -> Form {
    Form::new().part(
        UPLOAD_FILE_FIELD,
        Part::bytes(contents).file_name(file_name.to_string()),
    )
}

impl ApiServerClient {
    // =============================================================================
    // Pipeline Uploads
    // =============================================================================

    /// Upload a pipeline definition file, creating a pipeline and its first
    /// version
    ///
    /// # Arguments
    /// * `file_name` - Name of the uploaded file; its extension selects the format
    /// * `contents` - Raw file contents
    /// * `params` - Optional display name, description and namespace
    pub async fn upload_pipeline(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        params: &UploadPipelineQuery,
    ) -> Result<Pipeline> {
        let url = format!("{}{}", self.base_url, UPLOAD_PATH);
        let query: Vec<_> = [
            escaped("name", &params.name),
            escaped("description", &params.description),
            escaped("namespace", &params.namespace),
        ]
        .into_iter()
        .flatten()
        .collect();

        let response = self
            .client
            .post(&url)
            .query(&query)
            .multipart(upload_form(file_name, contents))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Upload a new version of an existing pipeline
    ///
    /// `params.pipeline_id` is required; the server rejects the upload
    /// without it.
    pub async fn upload_pipeline_version(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        params: &UploadPipelineVersionQuery,
    ) -> Result<PipelineVersion> {
        let pipeline_id = params
            .pipeline_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClientError::InvalidRequest("pipeline id is required".to_string()))?;

        let url = format!("{}{}", self.base_url, UPLOAD_VERSION_PATH);
        let mut query: Vec<_> = [
            escaped("name", &params.name),
            escaped("description", &params.description),
        ]
        .into_iter()
        .flatten()
        .collect();
        query.push(("pipelineid", pipeline_id.to_string()));

        let response = self
            .client
            .post(&url)
            .query(&query)
            .multipart(upload_form(file_name, contents))
            .send()
            .await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Pipeline Listing
    // =============================================================================

    /// List the pipelines of `namespace` matching every predicate of `filter`
    pub async fn list_pipelines(
        &self,
        namespace: Option<&str>,
        filter: &Filter,
    ) -> Result<ListPipelinesResponse> {
        let url = format!("{}{}", self.base_url, LIST_PATH);

        let mut query = Vec::new();
        if let Some(namespace) = namespace {
            query.push(("namespace", urlencoding::encode(namespace).into_owned()));
        }
        if !filter.is_empty() {
            let encoded = serde_json::to_string(filter)
                .map_err(|e| ClientError::InvalidRequest(format!("Invalid filter: {}", e)))?;
            query.push(("filter", encoded));
        }

        let response = self.client.get(&url).query(&query).send().await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaped_pre_encodes_value() {
        let value = Some("my pipeline/v1".to_string());
        assert_eq!(
            escaped("name", &value),
            Some(("name", "my%20pipeline%2Fv1".to_string()))
        );
        assert_eq!(escaped("name", &None), None);
    }

    #[tokio::test]
    async fn test_version_upload_requires_pipeline_id() {
        let client = ApiServerClient::new("http://localhost:8888");
        let params = UploadPipelineVersionQuery::default();

        let err = client
            .upload_pipeline_version("v2.yaml", b"a: 1".to_vec(), &params)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }
}
