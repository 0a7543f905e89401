//! Everything that runs next to the HTTP server or on its own in the worker binary.

use pdfgate_core::WorkerSettings;
use pdfgate_processing::Converter;
use pdfgate_services::{ExpirySweeper, JobStore};
use pdfgate_storage::JobQueue;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{LeaseReaper, WorkerPool, WorkerPoolHandle};

/// Handles of the worker pool, lease reaper, and expiry sweeper.
pub struct BackgroundTasks {
    pool: Option<WorkerPoolHandle>,
    reaper: Option<JoinHandle<()>>,
    sweeper: Option<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Start the background tasks. With `run_workers` off only the expiry sweeper runs,
    /// which suits an API process in front of standalone workers.
    pub fn spawn(
        jobs: JobStore,
        queue: Arc<dyn JobQueue>,
        converter: Arc<dyn Converter>,
        settings: &WorkerSettings,
        run_workers: bool,
        shutdown: &CancellationToken,
    ) -> Self {
        let sweeper = Arc::new(ExpirySweeper::new(jobs.clone(), settings.sweep_interval))
            .start(shutdown.clone());

        if !run_workers {
            return Self {
                pool: None,
                reaper: None,
                sweeper,
            };
        }

        let reaper = Arc::new(LeaseReaper::new(
            jobs.clone(),
            queue.clone(),
            settings.reap_interval,
            settings.max_attempts,
        ))
        .start(shutdown.clone());

        let pool = Arc::new(WorkerPool::new(jobs, queue, converter, settings.clone()))
            .start(shutdown.clone());

        Self {
            pool: Some(pool),
            reaper,
            sweeper,
        }
    }

    /// Wait for all tasks. Returns once the shutdown token has been cancelled and every
    /// in-flight conversion has finished.
    pub async fn join(self) {
        if let Some(pool) = self.pool {
            pool.join().await;
        }
        for task in [self.reaper, self.sweeper].into_iter().flatten() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Background task panicked");
            }
        }
    }
}
