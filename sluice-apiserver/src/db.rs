use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create pipelines table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            namespace VARCHAR(63) NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL,
            default_version_id UUID,
            UNIQUE (namespace, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create pipeline versions table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_versions (
            id UUID PRIMARY KEY,
            pipeline_id UUID NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
            name VARCHAR(255) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL,
            pipeline_spec BYTEA NOT NULL,
            UNIQUE (pipeline_id, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for list queries
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pipelines_namespace_created_at ON pipelines(namespace, created_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pipeline_versions_pipeline_id ON pipeline_versions(pipeline_id)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
