//! Pipeline API Handlers
//!
//! Filtered listing of pipelines. The filter is validated here so a
//! malformed predicate never reaches the store.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::HeaderMap,
    response::Response,
};
use sluice_core::domain::filter::Filter;
use sluice_core::dto::pipeline::{ListPipelinesQuery, ListPipelinesResponse};

use crate::api::error::{ApiError, ApiResult, ErrorKind};
use crate::api::response::json_response;
use crate::api::state::AppState;
use crate::authorizer::{ResourceAttributes, Verb};
use crate::repository::ResourceError;
use crate::service::ingest::query_unescape;

/// GET /apis/v1beta1/pipelines
/// List the pipelines of a namespace matching an optional filter
pub async fn list_pipelines(
    State(state): State<AppState>,
    query: Result<Query<ListPipelinesQuery>, QueryRejection>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let Query(query) = query.map_err(|e| ApiError::invalid_input(e.body_text()))?;

    let namespace = query_unescape(query.namespace.as_deref().unwrap_or_default())
        .map_err(|e| ApiError::from(e).wrap("Invalid pipeline namespace"))?;
    let filter = parse_filter(query.filter.as_deref())?;

    tracing::debug!(
        "Listing pipelines in '{}' with {} predicate(s)",
        namespace,
        filter.predicates.len()
    );

    state
        .gate()
        .authorize(
            &headers,
            None,
            ResourceAttributes::new(namespace.clone(), Verb::List),
        )
        .await
        .map_err(|e| e.wrap("Authorization to namespace failed"))?;

    let pipelines = state
        .resources
        .list_pipelines(&namespace, &filter)
        .await
        .map_err(|err| {
            let kind = match err {
                ResourceError::InvalidArgument(_) => ErrorKind::InvalidInput,
                _ => ErrorKind::Internal,
            };
            kind.with_message(err.to_string())
                .with_source(err)
                .wrap("Failed to list pipelines")
        })?;

    let response = ListPipelinesResponse {
        total_size: pipelines.len(),
        pipelines,
    };

    json_response(&response, "Error serializing pipelines")
}

fn parse_filter(raw: Option<&str>) -> Result<Filter, ApiError> {
    match raw.filter(|f| !f.trim().is_empty()) {
        Some(raw) => Filter::from_json(raw).map_err(|e| {
            ApiError::invalid_input(e.to_string())
                .with_source(e)
                .wrap("Invalid filter")
        }),
        None => Ok(Filter::default()),
    }
}
