use crate::ConvertError;
use async_trait::async_trait;
use pdfgate_core::constants::PDF_MAGIC;
use pdfgate_core::SourceFormat;
use std::time::{Duration, Instant};

/// Renders a source document to PDF bytes.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, input: &[u8], format: SourceFormat) -> Result<Vec<u8>, ConvertError>;

    /// Short engine name for logs.
    fn name(&self) -> &'static str;
}

/// Run `converter` with a hard time limit.
///
/// Dropping the conversion future on timeout kills any child process the engine spawned.
pub async fn convert_with_timeout(
    converter: &dyn Converter,
    input: &[u8],
    format: SourceFormat,
    limit: Duration,
) -> Result<Vec<u8>, ConvertError> {
    let started = Instant::now();
    let result = match tokio::time::timeout(limit, converter.convert(input, format)).await {
        Ok(result) => result,
        Err(_) => Err(ConvertError::Timeout(limit)),
    };
    tracing::debug!(
        engine = converter.name(),
        format = %format,
        input_bytes = input.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "Conversion finished"
    );
    result
}

/// Reject engine output that is not a PDF.
pub fn ensure_pdf(output: Vec<u8>) -> Result<Vec<u8>, ConvertError> {
    if output.starts_with(PDF_MAGIC) {
        Ok(output)
    } else if output.is_empty() {
        Err(ConvertError::failed("engine produced an empty document"))
    } else {
        Err(ConvertError::failed("engine output is not a PDF document"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sleepy;

    #[async_trait]
    impl Converter for Sleepy {
        async fn convert(&self, _: &[u8], _: SourceFormat) -> Result<Vec<u8>, ConvertError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(b"%PDF".to_vec())
        }

        fn name(&self) -> &'static str {
            "sleepy"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_conversion_times_out() {
        let err = convert_with_timeout(&Sleepy, b"x", SourceFormat::Txt, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Timeout(d) if d == Duration::from_secs(2)));
    }

    #[test]
    fn ensure_pdf_checks_magic_bytes() {
        assert!(ensure_pdf(b"%PDF-1.7\n".to_vec()).is_ok());
        assert!(ensure_pdf(Vec::new()).is_err());
        assert!(ensure_pdf(b"<html>".to_vec()).is_err());
    }
}
