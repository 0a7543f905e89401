//! Worker pool: one long-lived task per slot, each blocking on the queue.

use chrono::Utc;
use pdfgate_core::{JobId, JobRecord, JobState, WorkerSettings};
use pdfgate_processing::{convert_with_timeout, sanitize_message, ConvertError, Converter};
use pdfgate_services::{JobSnapshot, JobStore};
use pdfgate_storage::keys::result_key;
use pdfgate_storage::{JobQueue, StorageError, StorageResult};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::retry::{compute_retry_backoff, with_retry};

/// `{hostname}-{pid}`, the prefix of every worker id in this process.
pub fn worker_id_prefix() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{}-{}", host, std::process::id())
}

/// What happened to one dequeued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemOutcome {
    Completed,
    Failed,
    /// Record missing, already claimed, or already terminal.
    Skipped,
    /// The job was deleted during conversion.
    Discarded,
    /// The lease reaper handed the job to another delivery during conversion.
    Superseded,
    /// Store trouble; the item went back to the queue.
    Requeued,
    /// Store trouble after the claim; left for the lease reaper.
    Abandoned,
}

pub struct WorkerPool {
    jobs: JobStore,
    queue: Arc<dyn JobQueue>,
    converter: Arc<dyn Converter>,
    settings: WorkerSettings,
    id_prefix: String,
}

/// Join handles of a running pool.
pub struct WorkerPoolHandle {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPoolHandle {
    /// Wait for every worker to exit. Only returns after the shutdown token is cancelled.
    pub async fn join(self) {
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Worker task panicked");
            }
        }
    }
}

impl WorkerPool {
    pub fn new(
        jobs: JobStore,
        queue: Arc<dyn JobQueue>,
        converter: Arc<dyn Converter>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            jobs,
            queue,
            converter,
            settings,
            id_prefix: worker_id_prefix(),
        }
    }

    /// Override the worker id prefix (defaults to `{hostname}-{pid}`).
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> WorkerPoolHandle {
        tracing::info!(
            concurrency = self.settings.concurrency,
            convert_timeout_secs = self.settings.convert_timeout.as_secs(),
            engine = self.converter.name(),
            "Worker pool started"
        );

        let workers = (0..self.settings.concurrency)
            .map(|slot| {
                let pool = self.clone();
                let shutdown = shutdown.clone();
                let worker_id = format!("{}-{}", self.id_prefix, slot);
                tokio::spawn(async move { pool.run_worker(worker_id, shutdown).await })
            })
            .collect();

        WorkerPoolHandle { workers }
    }

    async fn run_worker(&self, worker_id: String, shutdown: CancellationToken) {
        tracing::debug!(worker_id = %worker_id, "Worker started");
        let mut consecutive_errors: u32 = 0;

        // Dequeue is not raced against the token: dropping a pop mid-flight could strand
        // the item in the in-flight list. Its timeout bounds shutdown latency instead.
        while !shutdown.is_cancelled() {
            match self.queue.dequeue(self.settings.dequeue_timeout).await {
                Ok(Some(item)) => {
                    consecutive_errors = 0;
                    let outcome = self.process_item(&worker_id, &item).await;
                    tracing::debug!(worker_id = %worker_id, item = %item, ?outcome, "Item handled");
                }
                Ok(None) => {
                    consecutive_errors = 0;
                }
                Err(e) => {
                    let delay = compute_retry_backoff(consecutive_errors);
                    consecutive_errors = consecutive_errors.saturating_add(1);
                    tracing::error!(
                        worker_id = %worker_id,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Dequeue failed"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::debug!(worker_id = %worker_id, "Worker stopped");
    }

    #[tracing::instrument(skip(self, item), fields(job_id = %item))]
    pub(crate) async fn process_item(&self, worker_id: &str, item: &str) -> ItemOutcome {
        let Ok(job_id) = item.parse::<JobId>() else {
            tracing::warn!("Dropping malformed queue item");
            self.ack(item).await;
            return ItemOutcome::Skipped;
        };

        let snapshot = match with_retry("load_record", || self.jobs.load(&job_id)).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!("Record gone before processing, dropping item");
                self.ack(item).await;
                return ItemOutcome::Skipped;
            }
            Err(e @ (StorageError::Corrupt(_) | StorageError::InvalidKey(_))) => {
                tracing::error!(error = %e, "Unreadable job record, dropping item");
                self.ack(item).await;
                return ItemOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load record");
                return self.requeue(item).await;
            }
        };

        let JobState::Queued { attempt } = snapshot.record.state else {
            tracing::debug!(
                state = snapshot.record.state.name(),
                "Duplicate delivery, skipping"
            );
            self.ack(item).await;
            return ItemOutcome::Skipped;
        };

        let lease = chrono::Duration::from_std(self.settings.lease())
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let claimed = match snapshot.record.start_processing(worker_id, Utc::now(), lease) {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot claim job");
                self.ack(item).await;
                return ItemOutcome::Skipped;
            }
        };
        let claimed = match with_retry("claim", || self.jobs.transition(&snapshot, &claimed)).await
        {
            Ok(Some(claimed)) => claimed,
            Ok(None) => {
                tracing::debug!("Another worker claimed the job first");
                self.ack(item).await;
                return ItemOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to claim job");
                return self.requeue(item).await;
            }
        };

        tracing::info!(
            worker_id,
            attempt,
            format = %claimed.record.source_format,
            "Processing job"
        );

        let started = Instant::now();
        let outcome = self.convert_and_store(&job_id, &claimed).await;
        let outcome = match outcome {
            Ok(next) => self.write_back(&job_id, &claimed, next, started).await,
            Err(e) => {
                tracing::error!(error = %e, "Store unavailable after claim");
                return self.release(item, &claimed).await;
            }
        };

        match outcome {
            ItemOutcome::Completed | ItemOutcome::Failed | ItemOutcome::Discarded => {
                if let Err(e) =
                    with_retry("delete_input", || self.jobs.delete_input(&job_id)).await
                {
                    tracing::warn!(error = %e, "Failed to delete input blob");
                }
                self.ack(item).await;
            }
            // The input stays for the next delivery. The reaper's requeue moves the
            // in-flight entry, so acking here could remove another delivery's entry.
            _ => {}
        }
        outcome
    }

    /// Run the conversion and build the terminal record. Only store failures are errors;
    /// conversion failures become a `failed` record.
    async fn convert_and_store(
        &self,
        job_id: &JobId,
        claimed: &JobSnapshot,
    ) -> StorageResult<(JobRecord, bool)> {
        let record = &claimed.record;
        let input = with_retry("load_input", || self.jobs.load_input(job_id)).await?;

        let result = match input {
            Some(input) => {
                convert_with_timeout(
                    self.converter.as_ref(),
                    &input,
                    record.source_format,
                    self.settings.convert_timeout,
                )
                .await
            }
            None => Err(ConvertError::InvalidInput(
                "Submitted document is no longer available".to_string(),
            )),
        };

        let now = Utc::now();
        match result {
            Ok(pdf) => {
                let size = pdf.len() as u64;
                let inserted =
                    with_retry("put_result", || self.jobs.put_result(job_id, pdf.clone())).await?;
                let done = record
                    .complete(result_key(job_id), size, now)
                    .map_err(|e| StorageError::Corrupt(e.to_string()))?;
                Ok((done, inserted))
            }
            Err(e) => {
                let error = sanitize_message(&e.to_string(), &[]);
                let trace = e.trace().map(|t| sanitize_message(t, &[]));
                tracing::warn!(kind = %e.kind(), error = %error, "Conversion failed");
                let failed = record
                    .fail(e.kind(), error, trace, now)
                    .map_err(|e| StorageError::Corrupt(e.to_string()))?;
                Ok((failed, false))
            }
        }
    }

    async fn write_back(
        &self,
        job_id: &JobId,
        claimed: &JobSnapshot,
        (next, wrote_blob): (JobRecord, bool),
        started: Instant,
    ) -> ItemOutcome {
        let duration_ms = started.elapsed().as_millis() as u64;
        let status = next.state.name();

        match with_retry("finish", || self.jobs.transition(claimed, &next)).await {
            Ok(Some(_)) => {
                match &next.state {
                    JobState::Done { size_bytes, .. } => {
                        tracing::info!(duration_ms, size_bytes, "Job completed")
                    }
                    JobState::Failed { kind, .. } => {
                        tracing::info!(duration_ms, kind = %kind, "Job failed")
                    }
                    _ => {}
                }
                if matches!(next.state, JobState::Done { .. }) {
                    ItemOutcome::Completed
                } else {
                    ItemOutcome::Failed
                }
            }
            Ok(None) => {
                match self.jobs.load(job_id).await {
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to reload record after lost write");
                        return ItemOutcome::Abandoned;
                    }
                    Ok(None) => {
                        tracing::warn!(status, "Job deleted during conversion, discarding outcome");
                        if wrote_blob {
                            if let Err(e) = self.jobs.delete_result(job_id).await {
                                tracing::warn!(error = %e, "Failed to delete orphan result");
                            }
                        }
                    }
                    Ok(Some(current)) => {
                        tracing::warn!(
                            status,
                            current = current.record.state.name(),
                            "Job no longer owned by this worker, discarding outcome"
                        );
                        return ItemOutcome::Superseded;
                    }
                }
                ItemOutcome::Discarded
            }
            Err(e) => {
                // The lease reaper will hand the job to another worker.
                tracing::error!(error = %e, "Failed to write job outcome");
                ItemOutcome::Abandoned
            }
        }
    }

    /// Give a claimed job back to the queue after a store failure.
    async fn release(&self, item: &str, claimed: &JobSnapshot) -> ItemOutcome {
        let Ok(next) = claimed.record.requeue_abandoned(Utc::now()) else {
            return ItemOutcome::Abandoned;
        };
        match with_retry("release", || self.jobs.transition(claimed, &next)).await {
            Ok(Some(_)) => self.requeue(item).await,
            _ => ItemOutcome::Abandoned,
        }
    }

    async fn requeue(&self, item: &str) -> ItemOutcome {
        if let Err(e) = with_retry("requeue", || self.queue.requeue(item)).await {
            tracing::error!(item, error = %e, "Failed to requeue item");
            return ItemOutcome::Abandoned;
        }
        ItemOutcome::Requeued
    }

    async fn ack(&self, item: &str) {
        if let Err(e) = with_retry("ack", || self.queue.ack(item)).await {
            tracing::warn!(item, error = %e, "Failed to ack item");
        }
    }
}
