//! Response Formatter
//!
//! Success path: created records are written as JSON with their snake_case
//! field names and symbolic enum names. The failure path lives in
//! [`ApiError`]'s `IntoResponse` implementation.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::api::error::ApiError;

/// Serialize `value` as a 200 JSON response, reporting serialization
/// failures as internal errors described by `context`
pub fn json_response<T: Serialize>(value: &T, context: &str) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(value).map_err(|e| {
        ApiError::internal(e.to_string())
            .with_source(e)
            .wrap(context)
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}
