//! Backend and service construction

use crate::state::AppState;
use anyhow::{Context, Result};
use pdfgate_core::Config;
use pdfgate_processing::DocumentConverter;
use std::sync::Arc;

pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let backends = pdfgate_storage::create_backends(config)
        .await
        .context("Failed to connect to storage backend")?;
    tracing::info!(
        store = %backends.store.backend_type(),
        queue = %backends.queue.backend_type(),
        "Storage backends ready"
    );

    let converter = DocumentConverter::from_config(&config.engines)
        .context("Failed to configure conversion engines")?;

    Ok(Arc::new(AppState::new(
        config.clone(),
        backends.store,
        backends.queue,
        Arc::new(converter),
    )))
}
