use anyhow::Context;
use pdfgate_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env().context("Failed to load configuration")?;

    pdfgate_infra::init_telemetry("pdfgate-api", config.uses_json_logs())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let app = pdfgate_api::setup::initialize_app(config.clone()).await?;

    pdfgate_api::setup::server::start_server(&config, app.router).await?;

    // The listener is closed; let running conversions finish before exiting.
    app.shutdown.cancel();
    app.background.join().await;
    pdfgate_infra::shutdown_telemetry().await;

    Ok(())
}
