use anyhow::Context;
use pdfgate_core::{Config, StorageBackend};
use pdfgate_processing::DocumentConverter;
use pdfgate_services::JobStore;
use pdfgate_worker::BackgroundTasks;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    pdfgate_infra::init_telemetry("pdfgate-worker", config.uses_json_logs())
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    if config.storage_backend == StorageBackend::Memory {
        anyhow::bail!(
            "The standalone worker needs a shared store; set STORAGE_BACKEND=redis"
        );
    }

    let backends = pdfgate_storage::create_backends(&config)
        .await
        .context("Failed to connect to storage backend")?;
    let converter = DocumentConverter::from_config(&config.engines)
        .context("Failed to configure conversion engines")?;

    let jobs = JobStore::new(backends.store.clone(), config.limits.job_ttl);
    let shutdown = CancellationToken::new();
    let tasks = BackgroundTasks::spawn(
        jobs,
        backends.queue.clone(),
        Arc::new(converter),
        &config.worker,
        true,
        &shutdown,
    );

    tracing::info!(
        backend = %config.storage_backend,
        queue = %config.queue_name,
        concurrency = config.worker.concurrency,
        "Worker ready"
    );

    pdfgate_infra::shutdown_signal().await;
    shutdown.cancel();
    tasks.join().await;

    pdfgate_infra::shutdown_telemetry().await;
    tracing::info!("Worker stopped");
    Ok(())
}
