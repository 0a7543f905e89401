use crate::JobStore;
use chrono::Utc;
use pdfgate_core::constants::{JOB_INPUT_PREFIX, JOB_META_PREFIX, JOB_RESULT_PREFIX};
use pdfgate_storage::keys::{job_id_from_key, meta_key};
use pdfgate_storage::{StorageError, StorageResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries dropped by the store's own expiry pass.
    pub purged: usize,
    /// Records older than the job TTL.
    pub expired_records: usize,
    /// Result and input blobs whose record no longer exists.
    pub orphan_blobs: usize,
}

/// Periodic reclamation of expired jobs for stores that do not expire keys on their own.
pub struct ExpirySweeper {
    jobs: JobStore,
    every: Duration,
}

impl ExpirySweeper {
    pub fn new(jobs: JobStore, every: Duration) -> Self {
        Self { jobs, every }
    }

    /// Start the background sweep. Returns `None` when the interval is zero.
    pub fn start(
        self: Arc<Self>,
        shutdown: CancellationToken,
    ) -> Option<tokio::task::JoinHandle<()>> {
        if self.every.is_zero() {
            tracing::info!("Expiry sweeper disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut ticker = interval(self.every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Expiry sweeper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.sweep().await {
                            Ok(report) if report != SweepReport::default() => {
                                tracing::info!(
                                    purged = report.purged,
                                    expired_records = report.expired_records,
                                    orphan_blobs = report.orphan_blobs,
                                    "Expiry sweep completed"
                                );
                            }
                            Ok(_) => {}
                            Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
                        }
                    }
                }
            }
        }))
    }

    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self) -> StorageResult<SweepReport> {
        let store = self.jobs.backend();
        let mut report = SweepReport {
            purged: store.purge_expired().await?,
            ..SweepReport::default()
        };

        let ttl = chrono::Duration::from_std(self.jobs.ttl())
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        let now = Utc::now();

        for key in store.scan(JOB_META_PREFIX).await? {
            let Some(id) = job_id_from_key(&key) else {
                continue;
            };
            match self.jobs.load(&id).await {
                Ok(Some(snapshot)) if snapshot.record.updated_at + ttl > now => {}
                Ok(Some(_)) => {
                    tracing::debug!(job_id = %id, "Deleting expired job");
                    self.jobs.delete_all(&id).await?;
                    report.expired_records += 1;
                }
                Ok(None) => {}
                Err(StorageError::Corrupt(e)) => {
                    tracing::warn!(job_id = %id, error = %e, "Deleting unreadable job record");
                    self.jobs.delete_all(&id).await?;
                    report.expired_records += 1;
                }
                Err(e) => return Err(e),
            }
        }

        for prefix in [JOB_RESULT_PREFIX, JOB_INPUT_PREFIX] {
            for key in store.scan(prefix).await? {
                let Some(id) = job_id_from_key(&key) else {
                    continue;
                };
                if store.get(&meta_key(&id)).await?.is_none() && store.delete(&key).await? {
                    tracing::debug!(key = %key, "Deleted orphan blob");
                    report.orphan_blobs += 1;
                }
            }
        }

        Ok(report)
    }
}
