//! Lease reaper: reclaims `processing` records whose worker stopped before writing back.

use chrono::Utc;
use pdfgate_core::constants::JOB_META_PREFIX;
use pdfgate_core::{FailureKind, JobState};
use pdfgate_services::JobStore;
use pdfgate_storage::keys::job_id_from_key;
use pdfgate_storage::{JobQueue, StorageResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::retry::with_retry;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReapReport {
    /// Jobs put back on the queue for another attempt.
    pub requeued: usize,
    /// Jobs that ran out of attempts and were failed with `worker_lost`.
    pub failed: usize,
}

pub struct LeaseReaper {
    jobs: JobStore,
    queue: Arc<dyn JobQueue>,
    every: Duration,
    max_attempts: u32,
}

impl LeaseReaper {
    pub fn new(
        jobs: JobStore,
        queue: Arc<dyn JobQueue>,
        every: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            jobs,
            queue,
            every,
            max_attempts,
        }
    }

    /// Spawn the reaper loop. Returns `None` when the interval is zero.
    pub fn start(
        self: Arc<Self>,
        shutdown: CancellationToken,
    ) -> Option<tokio::task::JoinHandle<()>> {
        if self.every.is_zero() {
            tracing::info!("Lease reaper disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut ticker = interval(self.every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Lease reaper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.reap_once().await {
                            Ok(report) if report != ReapReport::default() => {
                                tracing::warn!(
                                    requeued = report.requeued,
                                    failed = report.failed,
                                    "Reclaimed jobs with expired leases"
                                );
                            }
                            Ok(_) => {}
                            Err(e) => tracing::error!(error = %e, "Lease reaper failed"),
                        }
                    }
                }
            }
        }))
    }

    /// One pass over all records.
    #[tracing::instrument(skip(self))]
    pub async fn reap_once(&self) -> StorageResult<ReapReport> {
        let mut report = ReapReport::default();
        let now = Utc::now();

        for key in self.jobs.backend().scan(JOB_META_PREFIX).await? {
            let Some(id) = job_id_from_key(&key) else {
                continue;
            };
            let snapshot = match self.jobs.load(&id).await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(job_id = %id, error = %e, "Skipping unreadable record");
                    continue;
                }
            };
            if !snapshot.record.lease_expired(now) {
                continue;
            }
            let JobState::Processing {
                ref worker_id,
                attempt,
                ..
            } = snapshot.record.state
            else {
                continue;
            };
            let item = id.to_string();

            if attempt + 1 >= self.max_attempts {
                let error = format!(
                    "Worker {} stopped responding after {} attempt(s)",
                    worker_id,
                    attempt + 1
                );
                let failed = match snapshot
                    .record
                    .fail(FailureKind::WorkerLost, error, None, now)
                {
                    Ok(failed) => failed,
                    Err(_) => continue,
                };
                if self.jobs.transition(&snapshot, &failed).await?.is_some() {
                    tracing::warn!(job_id = %id, worker_id = %worker_id, attempt, "Job failed: worker lost");
                    with_retry("ack", || self.queue.ack(&item)).await?;
                    self.jobs.delete_input(&id).await?;
                    report.failed += 1;
                }
            } else {
                let requeued = match snapshot.record.requeue_abandoned(now) {
                    Ok(requeued) => requeued,
                    Err(_) => continue,
                };
                if self.jobs.transition(&snapshot, &requeued).await?.is_some() {
                    tracing::warn!(job_id = %id, worker_id = %worker_id, attempt, "Requeuing job with expired lease");
                    with_retry("requeue", || self.queue.requeue(&item)).await?;
                    report.requeued += 1;
                }
            }
        }

        Ok(report)
    }
}
