//! Conversion entry points: inline HTML rendering and asynchronous job submission.

use crate::error::HttpAppError;
use crate::handlers::{body_too_large, pdf_response};
use crate::state::AppState;
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use pdfgate_core::constants::DEFAULT_PDF_FILENAME;
use pdfgate_core::{AppError, JobId};
use pdfgate_services::SubmitRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct GeneratePdfRequest {
    #[serde(default)]
    pub html: Option<String>,
}

/// `POST /generate-pdf`: render small HTML inline and return the PDF.
pub async fn generate_pdf(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<GeneratePdfRequest>, JsonRejection>,
) -> Result<Response, HttpAppError> {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(body_too_large(&headers, state.config.limits.sync_max_html_bytes).into());
        }
        Err(rejection) => return Err(rejection.into()),
    };

    let pdf = state.sync.render_html(request.html.as_deref()).await?;
    tracing::info!(size_bytes = pdf.len(), "Rendered HTML inline");
    Ok(pdf_response(pdf, DEFAULT_PDF_FILENAME))
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub job_id: JobId,
    pub filename: String,
    pub status_url: String,
    pub result_url: String,
}

/// `POST /generate-pdf-async`: queue a document for conversion.
///
/// Multipart fields: `file` (required), `as_base64` (optional boolean), `format` (optional
/// source format overriding the filename extension).
pub async fn generate_pdf_async(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmitResponse>, HttpAppError> {
    let max = state.config.limits.max_file_size;
    let request = read_submission(multipart?)
        .await
        .map_err(|e| match e {
            FormError::Multipart(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                HttpAppError::from(body_too_large(&headers, max))
            }
            FormError::Multipart(err) => HttpAppError::from(err),
            FormError::Invalid(err) => HttpAppError::from(err),
        })?;

    let job = state.submission.submit(request).await?;
    tracing::info!(job_id = %job.job_id, format = %job.source_format, "Job queued");

    Ok(Json(SubmitResponse {
        message: "Job queued successfully".to_string(),
        job_id: job.job_id,
        filename: job.filename,
        status_url: format!("/job-status/{}", job.job_id),
        result_url: format!("/job-result/{}", job.job_id),
    }))
}

enum FormError {
    Multipart(MultipartError),
    Invalid(AppError),
}

impl From<MultipartError> for FormError {
    fn from(err: MultipartError) -> Self {
        FormError::Multipart(err)
    }
}

impl From<AppError> for FormError {
    fn from(err: AppError) -> Self {
        FormError::Invalid(err)
    }
}

async fn read_submission(mut multipart: Multipart) -> Result<SubmitRequest, FormError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut as_base64 = false;
    let mut declared_format = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string).unwrap_or_default();
        match name.as_str() {
            "file" => {
                if file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    )
                    .into());
                }
                let filename = field.file_name().map(str::to_string).unwrap_or_default();
                let data = field.bytes().await?;
                file = Some((filename, data.to_vec()));
            }
            "as_base64" => as_base64 = parse_flag(&field.text().await?)?,
            "format" => {
                let value = field.text().await?;
                let value = value.trim();
                if !value.is_empty() {
                    declared_format = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    let (filename, payload) =
        file.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    Ok(SubmitRequest {
        filename,
        payload,
        declared_format,
        as_base64,
    })
}

fn parse_flag(raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_lowercase().as_str() {
        "" | "false" | "0" | "no" | "off" => Ok(false),
        "true" | "1" | "yes" | "on" => Ok(true),
        other => Err(AppError::InvalidInput(format!(
            "as_base64 must be a boolean, got '{}'",
            other
        ))),
    }
}
