//! # Taskcamp API Server
//!
//! This is the main API server for Taskcamp, a project management service:
//! projects, role-scoped memberships, tasks with attachments, subtasks
//! driving derived task status, and project notes.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Account lifecycle (register, verify, login, refresh, reset)
//! - Project CRUD with per-project RBAC
//! - Tasks, subtasks, attachments, and notes
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskcamp-api
//! ```

use std::sync::Arc;

use taskcamp_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskcamp_shared::{
    db::{migrations::run_migrations, pool::create_pool, pool::DatabaseConfig},
    gateway::{mail::LogMailer, storage::InMemoryStorage},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskcamp_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskcamp API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..DatabaseConfig::default()
    })
    .await?;

    run_migrations(&pool).await?;

    // Local backends; swap for real gateways in deployment builds
    let storage = Arc::new(InMemoryStorage::new());
    let mailer = Arc::new(LogMailer);

    let bind_address = config.bind_address();
    let state = AppState::new(pool, config, storage, mailer);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
