//! Pipeline domain types
//!
//! Records owned by the resource manager and rendered on the wire with their
//! snake_case field names and symbolic enum names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of resource a [`ResourceKey`] points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    #[serde(rename = "UNKNOWN_RESOURCE_TYPE")]
    Unknown,
    Namespace,
    Pipeline,
    PipelineVersion,
}

/// Relationship between the referencing record and the referenced resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    #[serde(rename = "UNKNOWN_RELATIONSHIP")]
    Unknown,
    Owner,
    Creator,
}

/// Identifies a resource by id and type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceKey {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

/// Typed edge from a record to another resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReference {
    pub key: ResourceKey,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub relationship: Relationship,
}

impl ResourceReference {
    /// Ownership edge from a version to its parent pipeline
    pub fn pipeline_owner(pipeline_id: impl Into<String>) -> Self {
        Self {
            key: ResourceKey {
                id: pipeline_id.into(),
                resource_type: ResourceType::Pipeline,
            },
            name: String::new(),
            relationship: Relationship::Owner,
        }
    }

    /// Ownership edge from a pipeline to the namespace it lives in
    pub fn namespace_owner(namespace: impl Into<String>) -> Self {
        Self {
            key: ResourceKey {
                id: namespace.into(),
                resource_type: ResourceType::Namespace,
            },
            name: String::new(),
            relationship: Relationship::Owner,
        }
    }
}

/// Find the id of the first reference with the given type and relationship
pub fn find_reference(
    references: &[ResourceReference],
    resource_type: ResourceType,
    relationship: Relationship,
) -> Option<&str> {
    references
        .iter()
        .find(|r| r.key.resource_type == resource_type && r.relationship == relationship)
        .map(|r| r.key.id.as_str())
}

/// Persisted pipeline record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_references: Vec<ResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_version: Option<PipelineVersion>,
}

impl Pipeline {
    /// Namespace the pipeline belongs to; empty when cluster-scoped
    pub fn namespace(&self) -> &str {
        find_reference(
            &self.resource_references,
            ResourceType::Namespace,
            Relationship::Owner,
        )
        .unwrap_or_default()
    }
}

/// Immutable revision of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineVersion {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_references: Vec<ResourceReference>,
}

impl PipelineVersion {
    /// Id of the owning pipeline, if the version carries an owner edge
    pub fn pipeline_id(&self) -> Option<&str> {
        find_reference(
            &self.resource_references,
            ResourceType::Pipeline,
            Relationship::Owner,
        )
    }
}
