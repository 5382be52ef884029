//! In-memory fakes of the resource manager and the authorization backend
//! that record every call made through them.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::Utc;
use sluice_core::domain::filter::Filter;
use sluice_core::domain::pipeline::{
    Pipeline, PipelineVersion, Relationship, ResourceReference, ResourceType, find_reference,
};
use sluice_core::dto::pipeline::{NewPipeline, NewPipelineVersion};
use uuid::Uuid;

use crate::authorizer::{Authorizer, AuthorizerError, ResourceAttributes};
use crate::repository::{ResourceError, ResourceManager};

#[derive(Default)]
struct Recorded {
    namespaces: HashMap<String, String>,
    lookups: usize,
    pipelines: Vec<(NewPipeline, Vec<u8>)>,
    versions: Vec<(NewPipelineVersion, bool)>,
    lists: Vec<(String, Filter)>,
}

#[derive(Default)]
pub struct FakeResourceManager {
    recorded: Mutex<Recorded>,
    fail_lookups: bool,
    fail_creates: bool,
}

impl FakeResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing pipeline and its namespace
    pub fn with_pipeline(self, id: &str, namespace: &str) -> Self {
        self.recorded
            .lock()
            .unwrap()
            .namespaces
            .insert(id.to_string(), namespace.to_string());
        self
    }

    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn failing_creates(mut self) -> Self {
        self.fail_creates = true;
        self
    }

    pub fn lookup_calls(&self) -> usize {
        self.recorded.lock().unwrap().lookups
    }

    pub fn created_pipelines(&self) -> Vec<(NewPipeline, Vec<u8>)> {
        self.recorded.lock().unwrap().pipelines.clone()
    }

    pub fn created_versions(&self) -> Vec<(NewPipelineVersion, bool)> {
        self.recorded.lock().unwrap().versions.clone()
    }

    pub fn list_calls(&self) -> Vec<(String, Filter)> {
        self.recorded.lock().unwrap().lists.clone()
    }
}

fn version_record(name: &str, description: &str, pipeline_id: &str) -> PipelineVersion {
    PipelineVersion {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        created_at: Utc::now(),
        description: description.to_string(),
        resource_references: vec![ResourceReference::pipeline_owner(pipeline_id)],
    }
}

fn pipeline_record(id: &str, name: &str, description: &str, namespace: &str) -> Pipeline {
    let mut resource_references = Vec::new();
    if !namespace.is_empty() {
        resource_references.push(ResourceReference::namespace_owner(namespace));
    }
    Pipeline {
        id: id.to_string(),
        created_at: Utc::now(),
        name: name.to_string(),
        description: description.to_string(),
        resource_references,
        default_version: Some(version_record(name, description, id)),
    }
}

#[async_trait]
impl ResourceManager for FakeResourceManager {
    async fn create_pipeline(
        &self,
        pipeline: NewPipeline,
        artifact: Vec<u8>,
    ) -> Result<Pipeline, ResourceError> {
        if self.fail_creates {
            return Err(ResourceError::Database(sqlx::Error::PoolTimedOut));
        }

        let id = Uuid::new_v4().to_string();
        let record = pipeline_record(
            &id,
            &pipeline.name,
            &pipeline.description,
            &pipeline.namespace,
        );

        let mut recorded = self.recorded.lock().unwrap();
        recorded.namespaces.insert(id, pipeline.namespace.clone());
        recorded.pipelines.push((pipeline, artifact));
        Ok(record)
    }

    async fn create_pipeline_version(
        &self,
        version: NewPipelineVersion,
        _artifact: Vec<u8>,
        auto_update_default: bool,
    ) -> Result<PipelineVersion, ResourceError> {
        if self.fail_creates {
            return Err(ResourceError::Database(sqlx::Error::PoolTimedOut));
        }

        let pipeline_id = find_reference(
            &version.resource_references,
            ResourceType::Pipeline,
            Relationship::Owner,
        )
        .ok_or_else(|| ResourceError::InvalidArgument("missing owner".to_string()))?
        .to_string();

        let mut recorded = self.recorded.lock().unwrap();
        if !recorded.namespaces.contains_key(&pipeline_id) {
            return Err(ResourceError::NotFound(format!("pipeline {}", pipeline_id)));
        }

        let record = version_record(&version.name, &version.description, &pipeline_id);
        recorded.versions.push((version, auto_update_default));
        Ok(record)
    }

    async fn namespace_of_pipeline(&self, pipeline_id: &str) -> Result<String, ResourceError> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.lookups += 1;

        if self.fail_lookups {
            return Err(ResourceError::Database(sqlx::Error::PoolTimedOut));
        }

        recorded
            .namespaces
            .get(pipeline_id)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(format!("pipeline {}", pipeline_id)))
    }

    async fn list_pipelines(
        &self,
        namespace: &str,
        filter: &Filter,
    ) -> Result<Vec<Pipeline>, ResourceError> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.lists.push((namespace.to_string(), filter.clone()));

        Ok(recorded
            .namespaces
            .iter()
            .filter(|(_, ns)| ns.as_str() == namespace)
            .map(|(id, ns)| pipeline_record(id, id, "", ns))
            .collect())
    }
}

/// Authorizer that answers with a fixed decision and records every request
pub struct RecordingAuthorizer {
    allow: bool,
    calls: Mutex<Vec<(HeaderMap, ResourceAttributes)>>,
}

impl RecordingAuthorizer {
    pub fn allowing() -> Self {
        Self {
            allow: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn denying() -> Self {
        Self {
            allow: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(HeaderMap, ResourceAttributes)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Authorizer for RecordingAuthorizer {
    async fn authorize(
        &self,
        metadata: &HeaderMap,
        attributes: &ResourceAttributes,
    ) -> Result<(), AuthorizerError> {
        self.calls
            .lock()
            .unwrap()
            .push((metadata.clone(), attributes.clone()));

        if self.allow {
            Ok(())
        } else {
            Err(AuthorizerError::Denied(format!(
                "no {:?} access to namespace '{}'",
                attributes.verb, attributes.namespace
            )))
        }
    }
}
