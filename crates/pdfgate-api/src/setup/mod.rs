//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::Result;
use pdfgate_core::Config;
use pdfgate_worker::BackgroundTasks;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A wired application: router plus the background tasks running next to it.
pub struct Application {
    pub state: Arc<AppState>,
    pub router: axum::Router,
    pub background: BackgroundTasks,
    /// Cancel to stop the background tasks; then await `background.join()`.
    pub shutdown: CancellationToken,
}

/// Connect the backends, build services, start background tasks, and build the router.
pub async fn initialize_app(config: Config) -> Result<Application> {
    tracing::info!(
        environment = %config.environment,
        backend = %config.storage_backend,
        "Configuration loaded and validated successfully"
    );

    let state = services::initialize_services(&config).await?;

    let shutdown = CancellationToken::new();
    let background = BackgroundTasks::spawn(
        state.jobs.clone(),
        state.queue.clone(),
        state.converter.clone(),
        &config.worker,
        config.worker.embedded,
        &shutdown,
    );

    let router = routes::setup_routes(&config, state.clone());

    Ok(Application {
        state,
        router,
        background,
        shutdown,
    })
}
