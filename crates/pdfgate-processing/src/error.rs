use pdfgate_core::{AppError, FailureKind};
use std::time::Duration;
use thiserror::Error;

/// Conversion failure as seen by the job lifecycle.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Conversion timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The engine ran and reported an error. `trace` carries its diagnostic output.
    #[error("Conversion failed: {message}")]
    Failed {
        message: String,
        trace: Option<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub fn failed(message: impl Into<String>) -> Self {
        ConvertError::Failed {
            message: message.into(),
            trace: None,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ConvertError::Timeout(_) => FailureKind::Timeout,
            ConvertError::InvalidInput(_) => FailureKind::InvalidInput,
            ConvertError::Failed { .. } | ConvertError::Io(_) => FailureKind::ConversionFailed,
        }
    }

    pub fn trace(&self) -> Option<&str> {
        match self {
            ConvertError::Failed { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }
}

impl From<ConvertError> for AppError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::Timeout(limit) => AppError::ConversionTimeout(limit.as_secs()),
            ConvertError::InvalidInput(msg) => AppError::InvalidInput(msg),
            ConvertError::Failed { message, .. } => AppError::ConversionFailed(message),
            ConvertError::Io(e) => AppError::Internal(format!("Conversion IO error: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfgate_core::ErrorMetadata;

    #[test]
    fn kinds_map_to_failure_kinds() {
        assert_eq!(
            ConvertError::Timeout(Duration::from_secs(1)).kind(),
            FailureKind::Timeout
        );
        assert_eq!(
            ConvertError::InvalidInput("empty".into()).kind(),
            FailureKind::InvalidInput
        );
        assert_eq!(
            ConvertError::failed("boom").kind(),
            FailureKind::ConversionFailed
        );
    }

    #[test]
    fn timeout_becomes_gateway_timeout() {
        let err: AppError = ConvertError::Timeout(Duration::from_secs(15)).into();
        assert_eq!(err.http_status_code(), 504);
        assert!(err.client_message().contains("15"));
    }
}
