//! Test helpers: build AppState and router for integration tests.
//!
//! Everything runs against the in-memory backends with a fake converter, so no engine
//! binaries or Redis are needed.

use async_trait::async_trait;
use axum_test::TestServer;
use pdfgate_api::setup::routes;
use pdfgate_api::AppState;
use pdfgate_core::{Config, SourceFormat};
use pdfgate_processing::{ConvertError, Converter};
use pdfgate_storage::{MemoryQueue, MemoryStore};
use pdfgate_worker::BackgroundTasks;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const MAX_FILE_SIZE: usize = 1024;
pub const SYNC_MAX_HTML_BYTES: usize = 256;

/// Echoes the input behind a PDF header. Inputs starting with `FAIL` fail like a broken
/// document would.
pub struct FakeConverter;

#[async_trait]
impl Converter for FakeConverter {
    async fn convert(&self, input: &[u8], _format: SourceFormat) -> Result<Vec<u8>, ConvertError> {
        if input.starts_with(b"FAIL") {
            return Err(ConvertError::Failed {
                message: "engine exited with status 1".to_string(),
                trace: Some("Error: source file could not be loaded".to_string()),
            });
        }
        let mut pdf = b"%PDF-1.7\n".to_vec();
        pdf.extend_from_slice(input);
        Ok(pdf)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.limits.max_file_size = MAX_FILE_SIZE;
    config.limits.sync_max_html_bytes = SYNC_MAX_HTML_BYTES;
    config.worker.concurrency = 2;
    config.worker.dequeue_timeout = Duration::from_millis(50);
    config.worker.sweep_interval = Duration::ZERO;
    config.worker.reap_interval = Duration::ZERO;
    config
}

/// Test application: server plus handles on the pieces tests inspect.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub queue: Arc<MemoryQueue>,
    shutdown: CancellationToken,
    _background: Option<BackgroundTasks>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn build(config: Config, with_workers: bool) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        queue.clone(),
        Arc::new(FakeConverter),
    ));

    let shutdown = CancellationToken::new();
    let background = with_workers.then(|| {
        BackgroundTasks::spawn(
            state.jobs.clone(),
            state.queue.clone(),
            state.converter.clone(),
            &config.worker,
            true,
            &shutdown,
        )
    });

    let router = routes::setup_routes(&config, state.clone());
    TestApp {
        server: TestServer::new(router).expect("failed to build test server"),
        state,
        queue,
        shutdown,
        _background: background,
    }
}

/// App with embedded workers draining the queue.
pub fn setup_test_app() -> TestApp {
    build(test_config(), true)
}

/// App without workers: submitted jobs stay `queued`.
pub fn setup_test_app_without_workers() -> TestApp {
    build(test_config(), false)
}

/// Poll `/job-status/{id}` until the job is `done` or `failed`.
pub async fn wait_for_terminal(server: &TestServer, job_id: &str) -> Value {
    for _ in 0..200 {
        let body: Value = server
            .get(&format!("/job-status/{}", job_id))
            .await
            .json();
        if matches!(body["status"].as_str(), Some("done") | Some("failed")) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {} did not finish", job_id);
}
