//! Scope Resolver
//!
//! Determines the namespace an upload is authorized against: the explicit
//! `namespace` parameter for new pipelines, or the parent pipeline's
//! namespace for new versions.

use crate::api::error::{ApiError, ErrorKind};
use crate::repository::{ResourceError, ResourceManager};
use crate::service::ingest::query_unescape;

/// Longest accepted namespace, in bytes; matches the `pipelines.namespace` column
pub const MAX_NAMESPACE_LENGTH: usize = 63;

/// Namespace for a new pipeline; absent means cluster-scoped (empty)
pub fn resolve_for_create(namespace_param: Option<&str>) -> Result<String, ApiError> {
    let namespace = query_unescape(namespace_param.unwrap_or_default()).map_err(|e| {
        ApiError::invalid_input(e.to_string())
            .wrap("Pipeline namespace in the query string has invalid format")
    })?;

    if namespace.len() > MAX_NAMESPACE_LENGTH {
        return Err(ApiError::invalid_input(format!(
            "namespace is too long, maximum length is {} bytes",
            MAX_NAMESPACE_LENGTH
        )));
    }

    Ok(namespace)
}

/// Namespace of the parent of a new version
///
/// A missing parent id is rejected before any lookup happens.
pub async fn resolve_for_version(
    resources: &dyn ResourceManager,
    pipeline_id: Option<&str>,
) -> Result<String, ApiError> {
    let pipeline_id = match pipeline_id {
        Some(id) if !id.is_empty() => id,
        _ => {
            return Err(ApiError::invalid_input(
                "Please specify a pipeline id when creating versions.",
            ));
        }
    };

    lookup_namespace(resources, pipeline_id)
        .await
        .map_err(|e| e.wrap("Failed to get namespace from pipeline id"))
}

/// Look up a pipeline's namespace, classifying absence as `NotFound`
pub async fn lookup_namespace(
    resources: &dyn ResourceManager,
    pipeline_id: &str,
) -> Result<String, ApiError> {
    resources
        .namespace_of_pipeline(pipeline_id)
        .await
        .map_err(|err| match err {
            ResourceError::NotFound(_) => ErrorKind::NotFound
                .with_message(err.to_string())
                .with_source(err),
            _ => ErrorKind::Internal
                .with_message("Namespace lookup failed")
                .with_source(err),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeResourceManager;

    #[test]
    fn test_create_scope_unescapes_parameter() {
        assert_eq!(resolve_for_create(Some("team%2Da")).unwrap(), "team-a");
        assert_eq!(resolve_for_create(Some("team-a")).unwrap(), "team-a");
    }

    #[test]
    fn test_create_scope_absent_is_cluster_scoped() {
        assert_eq!(resolve_for_create(None).unwrap(), "");
    }

    #[test]
    fn test_create_scope_rejects_malformed_escape() {
        let err = resolve_for_create(Some("team%g1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_create_scope_rejects_long_namespace() {
        let long = "n".repeat(MAX_NAMESPACE_LENGTH + 1);
        let err = resolve_for_create(Some(&long)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let longest = "n".repeat(MAX_NAMESPACE_LENGTH);
        assert_eq!(resolve_for_create(Some(&longest)).unwrap(), longest);
    }

    #[tokio::test]
    async fn test_version_scope_requires_pipeline_id() {
        let resources = FakeResourceManager::new();

        for id in [None, Some("")] {
            let err = resolve_for_version(&resources, id).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
        assert_eq!(resources.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn test_version_scope_uses_parent_namespace() {
        let resources = FakeResourceManager::new().with_pipeline("123", "team-b");

        let namespace = resolve_for_version(&resources, Some("123")).await.unwrap();
        assert_eq!(namespace, "team-b");
        assert_eq!(resources.lookup_calls(), 1);
    }

    #[tokio::test]
    async fn test_version_scope_missing_parent() {
        let resources = FakeResourceManager::new();

        let err = resolve_for_version(&resources, Some("404")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.message().starts_with("Failed to get namespace"));
    }

    #[tokio::test]
    async fn test_version_scope_backend_failure_is_internal() {
        let resources = FakeResourceManager::new().failing_lookups();

        let err = resolve_for_version(&resources, Some("123")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
