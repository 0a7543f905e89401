use crate::JobStore;
use pdfgate_core::{AppError, FailureKind, JobId, JobRecord, JobState};

const NOT_FOUND_MESSAGE: &str = "Job not found or expired";

/// Outcome of a result query for a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Ready {
        record: JobRecord,
        pdf: Vec<u8>,
    },
    Failed {
        record: JobRecord,
        kind: FailureKind,
        error: String,
        trace: Option<String>,
    },
}

/// Read-only job queries plus explicit deletion. Never touches the queue.
#[derive(Clone)]
pub struct StatusService {
    jobs: JobStore,
}

impl StatusService {
    pub fn new(jobs: JobStore) -> Self {
        Self { jobs }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_status(&self, id: &JobId) -> Result<JobRecord, AppError> {
        match self.jobs.load(id).await? {
            Some(snapshot) => Ok(snapshot.record),
            None => Err(not_found()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_result(&self, id: &JobId) -> Result<JobResult, AppError> {
        let record = self.get_status(id).await?;
        match record.state.clone() {
            JobState::Queued { .. } | JobState::Processing { .. } => {
                Err(AppError::NotReady(id.to_string()))
            }
            JobState::Done { .. } => match self.jobs.load_result(id).await? {
                Some(pdf) => Ok(JobResult::Ready { record, pdf }),
                None => {
                    // The blob expires a moment before its record.
                    tracing::debug!(job_id = %id, "Result blob missing for finished job");
                    Err(not_found())
                }
            },
            JobState::Failed {
                kind, error, trace, ..
            } => Ok(JobResult::Failed {
                record,
                kind,
                error,
                trace,
            }),
        }
    }

    /// Remove a job and its blobs. A conversion already running is not interrupted; its
    /// write-back finds the record gone and is dropped.
    #[tracing::instrument(skip(self))]
    pub async fn delete_job(&self, id: &JobId) -> Result<(), AppError> {
        if self.jobs.delete_all(id).await? {
            tracing::info!(job_id = %id, "Job deleted");
            Ok(())
        } else {
            Err(not_found())
        }
    }
}

fn not_found() -> AppError {
    AppError::NotFound(NOT_FOUND_MESSAGE.to_string())
}
