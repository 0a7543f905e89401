use pdfgate_core::{AppError, JobLimits, SourceFormat};
use pdfgate_processing::{convert_with_timeout, Converter};
use std::sync::Arc;

/// Body rendered when the caller sends no HTML at all.
pub const EMPTY_HTML_PLACEHOLDER: &str = "<p>No HTML provided</p>";

/// Inline HTML rendering for small documents. No record, no queue.
#[derive(Clone)]
pub struct SyncConversionService {
    converter: Arc<dyn Converter>,
    limits: JobLimits,
}

impl SyncConversionService {
    pub fn new(converter: Arc<dyn Converter>, limits: JobLimits) -> Self {
        Self { converter, limits }
    }

    #[tracing::instrument(skip(self, html), fields(html_bytes = html.map(str::len).unwrap_or(0)))]
    pub async fn render_html(&self, html: Option<&str>) -> Result<Vec<u8>, AppError> {
        let html = match html.map(str::trim) {
            Some(h) if !h.is_empty() => h,
            _ => EMPTY_HTML_PLACEHOLDER,
        };

        if html.len() > self.limits.sync_max_html_bytes {
            return Err(AppError::PayloadTooLarge {
                size: html.len(),
                max: self.limits.sync_max_html_bytes,
            });
        }

        let pdf = convert_with_timeout(
            self.converter.as_ref(),
            html.as_bytes(),
            SourceFormat::Html,
            self.limits.sync_timeout,
        )
        .await?;
        Ok(pdf)
    }
}
