use crate::JobStore;
use chrono::Utc;
use pdfgate_core::{AppError, JobId, JobLimits, JobRecord, SourceFormat};
use pdfgate_storage::JobQueue;
use std::path::Path;
use std::sync::Arc;

/// Parameters of one asynchronous conversion request.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub filename: String,
    pub payload: Vec<u8>,
    /// Explicit source format; detected from the filename extension when absent.
    pub declared_format: Option<String>,
    pub as_base64: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    pub job_id: JobId,
    pub filename: String,
    pub source_format: SourceFormat,
}

/// Validates a request, persists the initial record and input, and enqueues the job.
#[derive(Clone)]
pub struct SubmissionService {
    jobs: JobStore,
    queue: Arc<dyn JobQueue>,
    limits: JobLimits,
}

impl SubmissionService {
    pub fn new(jobs: JobStore, queue: Arc<dyn JobQueue>, limits: JobLimits) -> Self {
        Self {
            jobs,
            queue,
            limits,
        }
    }

    /// Accept a job. Returns once the record, the input, and the queue entry are all
    /// written; never waits for the conversion itself.
    #[tracing::instrument(skip(self, request), fields(filename = %request.filename, size = request.payload.len()))]
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmittedJob, AppError> {
        let filename = clean_filename(&request.filename);
        let source_format = self.validate(&filename, &request)?;
        self.check_capacity().await?;

        let job_id = JobId::new();
        let record = JobRecord::new_queued(
            job_id,
            filename.clone(),
            source_format,
            request.as_base64,
            request.payload.len() as u64,
            Utc::now(),
        );

        if !self.jobs.create(&record).await? {
            return Err(AppError::Internal(format!("Job id {} already in use", job_id)));
        }

        if let Err(e) = self.jobs.put_input(&job_id, request.payload).await {
            self.rollback(&job_id).await;
            return Err(e.into());
        }

        if let Err(e) = self.queue.enqueue(&job_id.to_string()).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to enqueue job, rolling back");
            self.rollback(&job_id).await;
            return Err(AppError::QueueUnavailable(e.to_string()));
        }

        tracing::info!(
            job_id = %job_id,
            format = %source_format,
            as_base64 = request.as_base64,
            "Job queued"
        );

        Ok(SubmittedJob {
            job_id,
            filename,
            source_format,
        })
    }

    fn validate(&self, filename: &str, request: &SubmitRequest) -> Result<SourceFormat, AppError> {
        if request.payload.is_empty() {
            return Err(AppError::InvalidInput("Uploaded file is empty".to_string()));
        }

        if request.payload.len() > self.limits.max_file_size {
            return Err(AppError::PayloadTooLarge {
                size: request.payload.len(),
                max: self.limits.max_file_size,
            });
        }

        let format = match request
            .declared_format
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
        {
            Some(declared) => declared
                .parse::<SourceFormat>()
                .map_err(|_| AppError::UnsupportedFormat(declared.to_string()))?,
            None => SourceFormat::from_filename(filename).ok_or_else(|| {
                AppError::UnsupportedFormat(format!("cannot detect the format of {:?}", filename))
            })?,
        };

        if !self.limits.is_allowed(format) {
            return Err(AppError::UnsupportedFormat(format.to_string()));
        }

        Ok(format)
    }

    async fn check_capacity(&self) -> Result<(), AppError> {
        if self.limits.max_queue_depth == 0 {
            return Ok(());
        }
        let depth = self
            .queue
            .depth()
            .await
            .map_err(|e| AppError::QueueUnavailable(e.to_string()))?;
        if depth >= self.limits.max_queue_depth {
            tracing::warn!(depth, max = self.limits.max_queue_depth, "Queue full, refusing job");
            return Err(AppError::QueueFull {
                depth,
                max: self.limits.max_queue_depth,
            });
        }
        Ok(())
    }

    async fn rollback(&self, job_id: &JobId) {
        if let Err(e) = self.jobs.delete_record(job_id).await {
            tracing::error!(job_id = %job_id, error = %e, "Rollback failed to delete record");
        }
        if let Err(e) = self.jobs.delete_input(job_id).await {
            tracing::error!(job_id = %job_id, error = %e, "Rollback failed to delete input");
        }
    }
}

/// Keep only the final path component of a client-supplied name.
fn clean_filename(raw: &str) -> String {
    let normalized = raw.replace('\\', "/");
    let name = Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>();
    let name = name.trim();
    if name.is_empty() || name == "." || name == ".." {
        "document".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_filename_strips_directories() {
        assert_eq!(clean_filename("a.docx"), "a.docx");
        assert_eq!(clean_filename("../../etc/passwd.txt"), "passwd.txt");
        assert_eq!(clean_filename("C:\\Users\\me\\report.odt"), "report.odt");
        assert_eq!(clean_filename(""), "document");
        assert_eq!(clean_filename("bad\nname.rtf"), "badname.rtf");
    }
}
