//! Upload API Handlers
//!
//! Multipart upload of pipelines and pipeline versions. Every request runs
//! Ingest, Resolve Scope, Authorize, Create and Respond in that order and
//! stops at the first failure.

use axum::{
    extract::{
        Multipart, Query, State, multipart::MultipartRejection, rejection::QueryRejection,
    },
    http::HeaderMap,
    response::Response,
};
use sluice_core::dto::pipeline::{
    UPLOAD_FILE_FIELD, UploadPipelineQuery, UploadPipelineVersionQuery,
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::response::json_response;
use crate::api::state::AppState;
use crate::authorizer::{ResourceAttributes, Verb};
use crate::service::ingest::{pipeline_name, query_unescape, read_pipeline_file};
use crate::service::{pipeline_service, scope};

/// POST /apis/v1beta1/pipelines/upload
/// Create a pipeline from an uploaded definition file
pub async fn upload_pipeline(
    State(state): State<AppState>,
    query: Result<Query<UploadPipelineQuery>, QueryRejection>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    state.counters.record_pipeline_upload();

    let Query(query) = query.map_err(|e| ApiError::invalid_input(e.body_text()))?;
    tracing::info!("Uploading pipeline");

    let (file_name, artifact) = read_upload(multipart, state.options.max_upload_bytes)
        .await
        .map_err(|e| e.wrap("Error read pipeline file"))?;

    let name = pipeline_name(query.name.as_deref(), &file_name)
        .map_err(|e| ApiError::from(e).wrap("Invalid pipeline name"))?;
    let description = unescape_description(query.description.as_deref())?;

    let namespace = scope::resolve_for_create(query.namespace.as_deref())
        .map_err(|e| e.wrap("Invalid pipeline namespace"))?;

    state
        .gate()
        .authorize(
            &headers,
            None,
            ResourceAttributes::new(namespace.clone(), Verb::Create),
        )
        .await
        .map_err(|e| e.wrap("Authorization to namespace failed"))?;

    let pipeline = pipeline_service::create_pipeline(
        state.resources.as_ref(),
        name,
        description,
        namespace,
        artifact,
    )
    .await?;

    json_response(&pipeline, "Error serializing pipeline")
}

/// POST /apis/v1beta1/pipelines/upload_version
/// Create a version of an existing pipeline from an uploaded definition file
pub async fn upload_pipeline_version(
    State(state): State<AppState>,
    query: Result<Query<UploadPipelineVersionQuery>, QueryRejection>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    state.counters.record_version_upload();

    let Query(query) = query.map_err(|e| ApiError::invalid_input(e.body_text()))?;
    let pipeline_id = query.pipeline_id.unwrap_or_default();
    tracing::info!("Uploading version of pipeline '{}'", pipeline_id);

    let (file_name, artifact) = read_upload(multipart, state.options.max_upload_bytes)
        .await
        .map_err(|e| e.wrap("Error read pipeline version file"))?;

    let name = pipeline_name(query.name.as_deref(), &file_name)
        .map_err(|e| ApiError::from(e).wrap("Invalid pipeline version name"))?;
    let description = unescape_description(query.description.as_deref())?;

    let namespace =
        scope::resolve_for_version(state.resources.as_ref(), Some(pipeline_id.as_str())).await?;

    state
        .gate()
        .authorize(
            &headers,
            Some(pipeline_id.as_str()),
            ResourceAttributes::new(namespace, Verb::Create),
        )
        .await
        .map_err(|e| e.wrap("Authorization to pipeline failed"))?;

    let version = pipeline_service::create_pipeline_version(
        state.resources.as_ref(),
        name,
        description,
        &pipeline_id,
        artifact,
        state.options.auto_update_default_version,
    )
    .await?;

    json_response(&version, "Error serializing pipeline version")
}

/// Read the `uploadfile` part of the form, returning its file name and
/// validated contents
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    max_bytes: usize,
) -> Result<(String, Vec<u8>), ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::invalid_input(e.body_text()))?;

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::invalid_input(e.body_text()))?;

        let Some(field) = field else {
            return Err(ApiError::invalid_input(format!(
                "form field '{}' is missing",
                UPLOAD_FILE_FIELD
            )));
        };

        if field.name() != Some(UPLOAD_FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let artifact = read_pipeline_file(&file_name, field, max_bytes).await?;
        return Ok((file_name, artifact));
    }
}

fn unescape_description(description: Option<&str>) -> Result<String, ApiError> {
    query_unescape(description.unwrap_or_default())
        .map_err(|e| ApiError::from(e).wrap("Invalid description"))
}
