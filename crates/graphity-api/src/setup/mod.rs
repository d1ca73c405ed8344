//! Application setup and initialization
//!
//! Everything `main` needs to go from a [`Config`] to a served router,
//! kept out of `main.rs` so integration tests can build the same app.

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use graphity_core::{Config, IdentifierValidator, TemplateRegistry};
use graphity_storage::{FileStager, LocalFileStore};
use graphity_worker::{CommandQueue, CommandWorker, LoggingExecutor, WorkerConfig};

use crate::services::CreatePipeline;
use crate::state::{AppState, UploadConfig};

/// Initialize the entire application.
///
/// The returned [`CommandWorker`] owns the executing side of the command
/// queue; shut it down after the server stops.
pub async fn initialize_app(config: Config) -> Result<(AppState, Router, CommandWorker)> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(&config.environment)
        .context("Failed to initialize telemetry")?;

    tracing::info!("Configuration loaded and validated successfully");

    let registry = match &config.templates_path {
        Some(path) => TemplateRegistry::load(path)
            .with_context(|| format!("Failed to load templates from {}", path.display()))?,
        None => TemplateRegistry::builtin(),
    };
    tracing::info!(templates = ?registry.names(), "Status update templates registered");

    let store = LocalFileStore::from_config(&config)
        .await
        .context("Failed to initialize file storage")?;

    let (queue, receiver) = CommandQueue::new(config.command_queue_capacity);
    let worker = CommandWorker::spawn(
        receiver,
        Arc::new(LoggingExecutor),
        WorkerConfig::from_config(&config),
    );

    let pipeline = CreatePipeline::new(
        IdentifierValidator::default(),
        registry,
        FileStager::new(Arc::new(store)),
        queue,
    );

    let state = AppState {
        upload: UploadConfig::from_config(&config),
        config: Arc::new(config),
        pipeline,
    };

    let router = routes::setup_routes(state.clone());

    Ok((state, router, worker))
}
