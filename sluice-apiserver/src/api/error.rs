//! API Error Handling
//!
//! Unified error type for the upload and list endpoints. Every failure
//! carries a kind (which fixes the HTTP status), a caller-facing message that
//! accumulates context as it propagates, and the underlying cause for logs.

use std::fmt;

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use sluice_core::dto::error::ErrorBody;

use crate::service::ingest::IngestError;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Written when the error body itself cannot be serialized
const FALLBACK_BODY: &str = "Error uploading pipeline";

/// Classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing request data
    InvalidInput,
    /// Permission denied or authorization backend unreachable
    AuthorizationFailed,
    /// Referenced parent resource is absent
    NotFound,
    /// Persistence or backend failure
    Internal,
}

impl ErrorKind {
    /// HTTP status written for this kind.
    ///
    /// `NotFound` is reported as 400: a missing parent surfaces as a
    /// resolution failure of the request, not as a missing endpoint resource.
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::InvalidInput | ErrorKind::AuthorizationFailed | ErrorKind::NotFound => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn with_message(self, message: impl Into<String>) -> ApiError {
        ApiError::new(self, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::AuthorizationFailed => "AuthorizationFailed",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// API error type
#[derive(Debug)]
#[must_use = "errors do nothing unless returned or rendered"]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    source: Option<BoxError>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Attach the underlying cause
    pub fn with_source(self, source: impl Into<BoxError>) -> Self {
        Self {
            source: Some(source.into()),
            ..self
        }
    }

    /// Prefix the message with a description of the failed step
    pub fn wrap(self, context: impl fmt::Display) -> Self {
        Self {
            message: format!("{}: {}", context, self.message),
            ..self
        }
    }

    /// Same as [`ApiError::wrap`] but also reclassifies the error
    pub fn wrap_as(self, kind: ErrorKind, context: impl fmt::Display) -> Self {
        Self {
            kind,
            ..self.wrap(context)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Kind, message and every cause in the source chain
    pub fn details(&self) -> String {
        let mut details = format!("{}: {}", self.kind, self.message);
        let mut cause = self.source.as_deref().map(|e| e as &dyn std::error::Error);
        while let Some(err) = cause {
            details.push_str("\ncaused by: ");
            details.push_str(&err.to_string());
            cause = err.source();
        }
        details
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = self.details();

        tracing::error!(status = status.as_u16(), "Request failed: {}", details);

        let body = ErrorBody {
            error_message: self.message,
            error_details: details,
        };

        match serde_json::to_vec(&body) {
            Ok(bytes) => (
                status,
                [(header::CONTENT_TYPE, "application/json")],
                bytes,
            )
                .into_response(),
            Err(err) => {
                tracing::error!("Failed to serialize error body: {}", err);
                (
                    status,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    FALLBACK_BODY,
                )
                    .into_response()
            }
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        ApiError::invalid_input(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
