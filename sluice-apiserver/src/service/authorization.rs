//! Authorization Gate
//!
//! Decides whether a request needs a permission check and, if so, completes
//! the resource attributes and forwards them with the caller's request
//! metadata to the external authorizer.

use axum::http::HeaderMap;

use crate::api::error::{ApiError, ErrorKind};
use crate::authorizer::{
    Authorizer, AuthorizerError, RBAC_PIPELINES_GROUP, RBAC_PIPELINES_VERSION,
    RBAC_RESOURCE_TYPE_PIPELINES, ResourceAttributes,
};
use crate::repository::ResourceManager;
use crate::service::scope::lookup_namespace;

pub struct AuthorizationGate<'a> {
    multi_user: bool,
    resources: &'a dyn ResourceManager,
    authorizer: &'a dyn Authorizer,
}

impl<'a> AuthorizationGate<'a> {
    pub fn new(
        multi_user: bool,
        resources: &'a dyn ResourceManager,
        authorizer: &'a dyn Authorizer,
    ) -> Self {
        Self {
            multi_user,
            resources,
            authorizer,
        }
    }

    /// Authorize `attrs` on behalf of the caller described by `metadata`.
    ///
    /// When a parent pipeline id is given and `attrs.namespace` is empty, the
    /// namespace is inherited from the parent before the empty-namespace
    /// check, so version uploads are gated by their parent's scope.
    pub async fn authorize(
        &self,
        metadata: &HeaderMap,
        parent_pipeline_id: Option<&str>,
        mut attrs: ResourceAttributes,
    ) -> Result<(), ApiError> {
        if !self.multi_user {
            return Ok(());
        }

        if let Some(pipeline_id) = parent_pipeline_id.filter(|id| !id.is_empty()) {
            if attrs.namespace.is_empty() {
                attrs.namespace = lookup_namespace(self.resources, pipeline_id)
                    .await
                    .map_err(|e| e.wrap("Failed to authorize with the pipeline id"))?;
            }
        }

        // TODO: cluster-scoped uploads skip the check entirely; gate them on a
        // cluster-level permission once the authorizer exposes one.
        if attrs.namespace.is_empty() {
            tracing::debug!("Skipping authorization for cluster-scoped request");
            return Ok(());
        }

        attrs.group = RBAC_PIPELINES_GROUP.to_string();
        attrs.version = RBAC_PIPELINES_VERSION.to_string();
        attrs.resource = RBAC_RESOURCE_TYPE_PIPELINES.to_string();

        tracing::debug!(
            namespace = %attrs.namespace,
            verb = ?attrs.verb,
            "Checking authorization"
        );

        self.authorizer
            .authorize(metadata, &attrs)
            .await
            .map_err(|err| {
                let kind = match err {
                    AuthorizerError::InvalidHeader(_) => ErrorKind::InvalidInput,
                    _ => ErrorKind::AuthorizationFailed,
                };
                kind.with_message(err.to_string())
                    .with_source(err)
                    .wrap("Authorization failure")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorizer::Verb;
    use crate::testing::{FakeResourceManager, RecordingAuthorizer};
    use axum::http::HeaderValue;

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-user", HeaderValue::from_static("alice@example.com"));
        headers
    }

    #[tokio::test]
    async fn test_single_user_never_calls_backend() {
        let resources = FakeResourceManager::new().with_pipeline("123", "team-b");
        let authorizer = RecordingAuthorizer::denying();
        let gate = AuthorizationGate::new(false, &resources, &authorizer);

        for namespace in ["", "team-a"] {
            let attrs = ResourceAttributes::new(namespace, Verb::Create);
            gate.authorize(&headers(), Some("123"), attrs).await.unwrap();
        }

        assert_eq!(authorizer.calls().len(), 0);
        assert_eq!(resources.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_namespace_skips_check() {
        let resources = FakeResourceManager::new();
        let authorizer = RecordingAuthorizer::denying();
        let gate = AuthorizationGate::new(true, &resources, &authorizer);

        gate.authorize(&headers(), None, ResourceAttributes::new("", Verb::Create))
            .await
            .unwrap();

        assert!(authorizer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_inherits_parent_namespace() {
        let resources = FakeResourceManager::new().with_pipeline("123", "team-b");
        let authorizer = RecordingAuthorizer::allowing();
        let gate = AuthorizationGate::new(true, &resources, &authorizer);

        gate.authorize(&headers(), Some("123"), ResourceAttributes::new("", Verb::Create))
            .await
            .unwrap();

        let calls = authorizer.calls();
        assert_eq!(calls.len(), 1);
        let (metadata, attrs) = &calls[0];
        assert_eq!(attrs.namespace, "team-b");
        assert_eq!(attrs.verb, Verb::Create);
        assert_eq!(attrs.group, RBAC_PIPELINES_GROUP);
        assert_eq!(attrs.version, RBAC_PIPELINES_VERSION);
        assert_eq!(attrs.resource, RBAC_RESOURCE_TYPE_PIPELINES);
        assert_eq!(metadata["x-user"], "alice@example.com");
    }

    #[tokio::test]
    async fn test_explicit_namespace_wins_over_parent() {
        let resources = FakeResourceManager::new().with_pipeline("123", "team-b");
        let authorizer = RecordingAuthorizer::allowing();
        let gate = AuthorizationGate::new(true, &resources, &authorizer);

        gate.authorize(
            &headers(),
            Some("123"),
            ResourceAttributes::new("team-a", Verb::Create),
        )
        .await
        .unwrap();

        assert_eq!(authorizer.calls()[0].1.namespace, "team-a");
        assert_eq!(resources.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn test_denial_is_authorization_failure() {
        let resources = FakeResourceManager::new();
        let authorizer = RecordingAuthorizer::denying();
        let gate = AuthorizationGate::new(true, &resources, &authorizer);

        let err = gate
            .authorize(&headers(), None, ResourceAttributes::new("team-a", Verb::Create))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AuthorizationFailed);
        assert!(err.message().starts_with("Authorization failure"));
    }

    #[tokio::test]
    async fn test_unknown_parent_fails() {
        let resources = FakeResourceManager::new();
        let authorizer = RecordingAuthorizer::allowing();
        let gate = AuthorizationGate::new(true, &resources, &authorizer);

        let err = gate
            .authorize(&headers(), Some("404"), ResourceAttributes::new("", Verb::Create))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(authorizer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unforwardable_header_is_invalid_input() {
        let resources = FakeResourceManager::new();
        let authorizer = crate::authorizer::HttpAuthorizer::new("http://127.0.0.1:1/review");
        let gate = AuthorizationGate::new(true, &resources, &authorizer);

        let mut metadata = HeaderMap::new();
        metadata.insert("x-user", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let err = gate
            .authorize(&metadata, None, ResourceAttributes::new("team-a", Verb::Create))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.message().contains("x-user"));
    }
}
