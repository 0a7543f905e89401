//! Server startup and graceful shutdown

use anyhow::Result;
use axum::Router;
use pdfgate_core::Config;

/// Serve until Ctrl+C or SIGTERM, then stop accepting and drain open requests.
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        max_file_size = config.limits.max_file_size,
        sync_max_html_bytes = config.limits.sync_max_html_bytes,
        job_ttl_secs = config.limits.job_ttl.as_secs(),
        max_queue_depth = config.limits.max_queue_depth,
        embedded_workers = config.worker.embedded,
        worker_concurrency = config.worker.concurrency,
        weasyprint_path = %config.engines.weasyprint_path,
        libreoffice_path = %config.engines.libreoffice_path,
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(pdfgate_infra::shutdown_signal())
        .await?;

    Ok(())
}
