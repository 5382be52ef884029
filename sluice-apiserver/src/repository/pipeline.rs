//! Pipeline Repository
//!
//! Postgres-backed [`ResourceManager`]: pipelines, their versions and the
//! namespace lookups the authorization path depends on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sluice_core::domain::filter::Filter;
use sluice_core::domain::pipeline::{
    Pipeline, PipelineVersion, Relationship, ResourceReference, ResourceType, find_reference,
};
use sluice_core::dto::pipeline::{NewPipeline, NewPipelineVersion};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::filter::push_filter;
use super::{ResourceError, ResourceManager};

#[derive(Debug, Clone)]
pub struct PgResourceManager {
    pool: PgPool,
}

impl PgResourceManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map unique violations to `AlreadyExists`, everything else to `Database`
fn conflict(err: sqlx::Error, what: impl Into<String>) -> ResourceError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ResourceError::AlreadyExists(what.into())
        }
        _ => ResourceError::Database(err),
    }
}

fn parse_pipeline_id(pipeline_id: &str) -> Result<Uuid, ResourceError> {
    Uuid::parse_str(pipeline_id)
        .map_err(|_| ResourceError::NotFound(format!("pipeline {}", pipeline_id)))
}

async fn insert_version(
    tx: &mut Transaction<'_, Postgres>,
    version: &VersionRecord<'_>,
) -> Result<(), ResourceError> {
    sqlx::query(
        r#"
        INSERT INTO pipeline_versions (
            id, pipeline_id, name, description, created_at, pipeline_spec
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(version.id)
    .bind(version.pipeline_id)
    .bind(version.name)
    .bind(version.description)
    .bind(version.created_at)
    .bind(version.artifact)
    .execute(&mut **tx)
    .await
    .map_err(|e| conflict(e, format!("pipeline version '{}'", version.name)))?;

    Ok(())
}

async fn set_default_version(
    tx: &mut Transaction<'_, Postgres>,
    pipeline_id: Uuid,
    version_id: Uuid,
) -> Result<(), ResourceError> {
    sqlx::query("UPDATE pipelines SET default_version_id = $1 WHERE id = $2")
        .bind(version_id)
        .bind(pipeline_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[async_trait]
impl ResourceManager for PgResourceManager {
    async fn create_pipeline(
        &self,
        req: NewPipeline,
        artifact: Vec<u8>,
    ) -> Result<Pipeline, ResourceError> {
        let pipeline_id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO pipelines (id, name, description, namespace, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(pipeline_id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.namespace)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict(e, format!("pipeline '{}'", req.name)))?;

        let version = VersionRecord {
            id: Uuid::new_v4(),
            pipeline_id,
            name: &req.name,
            description: &req.description,
            created_at: now,
            artifact: &artifact,
        };
        insert_version(&mut tx, &version).await?;
        set_default_version(&mut tx, pipeline_id, version.id).await?;

        tx.commit().await?;

        let default_version = version.into_domain();
        Ok(pipeline_record(
            pipeline_id,
            req.name,
            req.description,
            &req.namespace,
            now,
            Some(default_version),
        ))
    }

    async fn create_pipeline_version(
        &self,
        req: NewPipelineVersion,
        artifact: Vec<u8>,
        auto_update_default: bool,
    ) -> Result<PipelineVersion, ResourceError> {
        let owner = find_reference(
            &req.resource_references,
            ResourceType::Pipeline,
            Relationship::Owner,
        )
        .ok_or_else(|| {
            ResourceError::InvalidArgument(
                "pipeline version has no owning pipeline reference".to_string(),
            )
        })?;
        let pipeline_id = parse_pipeline_id(owner)?;

        let mut tx = self.pool.begin().await?;

        // Lock the parent so concurrent default-version updates serialize
        let parent: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM pipelines WHERE id = $1 FOR UPDATE")
                .bind(pipeline_id)
                .fetch_optional(&mut *tx)
                .await?;
        if parent.is_none() {
            return Err(ResourceError::NotFound(format!("pipeline {}", pipeline_id)));
        }

        let version = VersionRecord {
            id: Uuid::new_v4(),
            pipeline_id,
            name: &req.name,
            description: &req.description,
            created_at: Utc::now(),
            artifact: &artifact,
        };
        insert_version(&mut tx, &version).await?;
        if auto_update_default {
            set_default_version(&mut tx, pipeline_id, version.id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Pipeline version created: {} ({}) for pipeline {}",
            version.name,
            version.id,
            pipeline_id
        );

        Ok(version.into_domain())
    }

    async fn namespace_of_pipeline(&self, pipeline_id: &str) -> Result<String, ResourceError> {
        let id = parse_pipeline_id(pipeline_id)?;

        sqlx::query_scalar::<_, String>("SELECT namespace FROM pipelines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ResourceError::NotFound(format!("pipeline {}", pipeline_id)))
    }

    async fn list_pipelines(
        &self,
        namespace: &str,
        filter: &Filter,
    ) -> Result<Vec<Pipeline>, ResourceError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT p.id, p.name, p.description, p.namespace, p.created_at,
                   v.id AS version_id, v.name AS version_name,
                   v.description AS version_description,
                   v.created_at AS version_created_at
            FROM pipelines p
            LEFT JOIN pipeline_versions v ON v.id = p.default_version_id
            WHERE p.namespace = "#,
        );
        builder.push_bind(namespace.to_string());
        push_filter(&mut builder, filter)?;
        builder.push(" ORDER BY p.created_at DESC");

        let rows = builder
            .build_query_as::<PipelineRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Pipeline::from).collect())
    }
}

fn pipeline_record(
    id: Uuid,
    name: String,
    description: String,
    namespace: &str,
    created_at: DateTime<Utc>,
    default_version: Option<PipelineVersion>,
) -> Pipeline {
    let mut resource_references = Vec::new();
    if !namespace.is_empty() {
        resource_references.push(ResourceReference::namespace_owner(namespace));
    }

    Pipeline {
        id: id.to_string(),
        created_at,
        name,
        description,
        resource_references,
        default_version,
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

struct VersionRecord<'a> {
    id: Uuid,
    pipeline_id: Uuid,
    name: &'a str,
    description: &'a str,
    created_at: DateTime<Utc>,
    artifact: &'a [u8],
}

impl VersionRecord<'_> {
    fn into_domain(self) -> PipelineVersion {
        PipelineVersion {
            id: self.id.to_string(),
            name: self.name.to_string(),
            created_at: self.created_at,
            description: self.description.to_string(),
            resource_references: vec![ResourceReference::pipeline_owner(
                self.pipeline_id.to_string(),
            )],
        }
    }
}

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    name: String,
    description: String,
    namespace: String,
    created_at: DateTime<Utc>,
    version_id: Option<Uuid>,
    version_name: Option<String>,
    version_description: Option<String>,
    version_created_at: Option<DateTime<Utc>>,
}

impl From<PipelineRow> for Pipeline {
    fn from(row: PipelineRow) -> Self {
        let default_version = match (row.version_id, row.version_name, row.version_created_at) {
            (Some(id), Some(name), Some(created_at)) => Some(PipelineVersion {
                id: id.to_string(),
                name,
                created_at,
                description: row.version_description.unwrap_or_default(),
                resource_references: vec![ResourceReference::pipeline_owner(row.id.to_string())],
            }),
            _ => None,
        };

        pipeline_record(
            row.id,
            row.name,
            row.description,
            &row.namespace,
            row.created_at,
            default_version,
        )
    }
}
