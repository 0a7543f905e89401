//! Job status, result retrieval, and deletion.

use crate::error::HttpAppError;
use crate::handlers::pdf_response;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use pdfgate_core::{AppError, FailureKind, JobId, JobRecord, JobState, SourceFormat};
use pdfgate_services::JobResult;
use serde::Serialize;
use std::sync::Arc;

/// Ids that do not parse cannot name a job, so they get the same answer as unknown ones.
fn parse_job_id(raw: &str) -> Result<JobId, HttpAppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Job not found or expired".to_string()).into())
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub filename: String,
    pub source_format: SourceFormat,
    pub as_base64: bool,
    pub input_size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `status` plus the fields of the current state.
    #[serde(flatten)]
    pub state: JobState,
}

impl From<JobRecord> for JobStatusResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            job_id: record.id,
            filename: record.filename,
            source_format: record.source_format,
            as_base64: record.as_base64,
            input_size_bytes: record.input_size_bytes,
            created_at: record.created_at,
            updated_at: record.updated_at,
            state: record.state,
        }
    }
}

/// `GET /job-status/{job_id}`
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, HttpAppError> {
    let job_id = parse_job_id(&job_id)?;
    let record = state.status.get_status(&job_id).await?;
    Ok(Json(record.into()))
}

#[derive(Debug, Serialize)]
pub struct Base64ResultResponse {
    pub job_id: JobId,
    pub filename: String,
    pub pdf_base64: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FailedJobResponse {
    pub job_id: JobId,
    pub status: &'static str,
    pub error: String,
    pub error_kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// `GET /job-result/{job_id}`: the PDF (raw or base64 JSON), 409 while the job is running,
/// 422 when it failed.
pub async fn job_result(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Response, HttpAppError> {
    let job_id = parse_job_id(&job_id)?;

    match state.status.get_result(&job_id).await? {
        JobResult::Ready { record, pdf } if record.as_base64 => Ok(Json(Base64ResultResponse {
            job_id,
            filename: record.filename,
            pdf_base64: STANDARD.encode(&pdf),
            status: "completed",
        })
        .into_response()),
        JobResult::Ready { record, pdf } => Ok(pdf_response(pdf, &record.pdf_filename())),
        JobResult::Failed {
            kind, error, trace, ..
        } => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(FailedJobResponse {
                job_id,
                status: "failed",
                error,
                error_kind: kind,
                trace,
            }),
        )
            .into_response()),
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteJobResponse {
    pub message: String,
    pub job_id: JobId,
}

/// `DELETE /job/{job_id}`
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<DeleteJobResponse>, HttpAppError> {
    let job_id = parse_job_id(&job_id)?;
    state.status.delete_job(&job_id).await?;
    Ok(Json(DeleteJobResponse {
        message: "Job deleted successfully".to_string(),
        job_id,
    }))
}
