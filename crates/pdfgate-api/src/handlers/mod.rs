//! HTTP handlers.

pub mod convert;
pub mod health;
pub mod jobs;
pub mod root;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use pdfgate_core::constants::{DEFAULT_PDF_FILENAME, PDF_CONTENT_TYPE};
use pdfgate_core::AppError;

/// `attachment; filename=...` with characters that would break the header replaced.
fn content_disposition(filename: &str) -> HeaderValue {
    let safe: String = filename
        .chars()
        .map(|c| match c {
            '"' | ';' | ',' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename={}", safe)).unwrap_or_else(|_| {
        HeaderValue::from_static("attachment; filename=document.pdf")
    })
}

/// A PDF download response.
pub(crate) fn pdf_response(pdf: Vec<u8>, filename: &str) -> Response {
    let filename = if filename.trim().is_empty() {
        DEFAULT_PDF_FILENAME
    } else {
        filename
    };
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, content_disposition(filename)),
        ],
        pdf,
    )
        .into_response()
}

/// The body limit cut the request off before validation could measure it.
pub(crate) fn body_too_large(headers: &HeaderMap, max: usize) -> AppError {
    let size = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(max.saturating_add(1));
    AppError::PayloadTooLarge { size, max }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_escapes_separators() {
        assert_eq!(
            content_disposition("a;b\".pdf"),
            "attachment; filename=a_b_.pdf"
        );
        assert_eq!(content_disposition("report.pdf"), "attachment; filename=report.pdf");
    }

    #[test]
    fn too_large_prefers_content_length() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            body_too_large(&headers, 10),
            AppError::PayloadTooLarge { size: 11, max: 10 }
        ));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("5000"));
        assert!(matches!(
            body_too_large(&headers, 10),
            AppError::PayloadTooLarge { size: 5000, max: 10 }
        ));
    }
}
