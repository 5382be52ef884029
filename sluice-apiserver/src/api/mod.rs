//! API Module
//!
//! HTTP API layer for the pipeline server.
//! Each submodule handles endpoints for a specific concern.

pub mod error;
pub mod health;
pub mod pipeline;
pub mod response;
pub mod state;
pub mod upload;

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::api::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Health and counters
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::upload_metrics))
        // Pipeline endpoints
        .route(
            "/apis/v1beta1/pipelines/upload",
            post(upload::upload_pipeline),
        )
        .route(
            "/apis/v1beta1/pipelines/upload_version",
            post(upload::upload_pipeline_version),
        )
        .route("/apis/v1beta1/pipelines", get(pipeline::list_pipelines))
        // Upload size is enforced while streaming the file part
        .layer(DefaultBodyLimit::disable())
        // Add state and middleware
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::api::state::UploadOptions;
    use crate::service::counters::UploadCounters;
    use crate::testing::{FakeResourceManager, RecordingAuthorizer};

    fn router() -> Router {
        let options = UploadOptions {
            multi_user: false,
            max_upload_bytes: 1024,
            auto_update_default_version: true,
        };
        let state = AppState::new(
            options,
            Arc::new(FakeResourceManager::new()),
            Arc::new(RecordingAuthorizer::allowing()),
            Arc::new(UploadCounters::new(true)),
        );
        create_router(state, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_metrics_snapshot() {
        let response = router()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["pipeline_upload_requests"], 0);
        assert_eq!(json["pipeline_version_upload_requests"], 0);
    }

    #[tokio::test]
    async fn test_upload_requires_multipart() {
        let response = router()
            .oneshot(
                Request::post("/apis/v1beta1/pipelines/upload")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
