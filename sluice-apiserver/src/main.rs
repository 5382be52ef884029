use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod authorizer;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;

#[cfg(test)]
mod testing;

use crate::api::state::{AppState, UploadOptions};
use crate::authorizer::{AllowAll, Authorizer, HttpAuthorizer};
use crate::config::Config;
use crate::repository::PgResourceManager;
use crate::service::counters::UploadCounters;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sluice_apiserver=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sluice API server...");

    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Invalid configuration");

    tracing::info!(
        "Multi-user mode: {}, max upload: {} bytes",
        config.multi_user,
        config.max_upload_bytes
    );

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let authorizer: Arc<dyn Authorizer> = match (&config.authorizer_url, config.multi_user) {
        (Some(url), true) => {
            tracing::info!("Authorizing requests against {}", url);
            Arc::new(HttpAuthorizer::new(url.clone()))
        }
        _ => Arc::new(AllowAll),
    };

    let state = AppState::new(
        UploadOptions::from(&config),
        Arc::new(PgResourceManager::new(pool)),
        authorizer,
        Arc::new(UploadCounters::new(config.collect_metrics)),
    );

    // Build router with all API endpoints
    let app = api::create_router(state, config.request_timeout);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
