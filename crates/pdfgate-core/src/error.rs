//! Error types module
//!
//! All user-facing failures of the job lifecycle are unified under [`AppError`]. Each
//! variant self-describes how it should be presented (HTTP status, machine code,
//! recoverability, log level) through the [`ErrorMetadata`] trait, so the HTTP layer
//! never has to match on variants itself.

/// How loudly a failed request is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Client mistakes: bad uploads, unknown ids
    Debug,
    /// Back-pressure, conversion failures
    Warn,
    /// Store or queue outages, bugs
    Error,
}

/// Presentation of an error at the HTTP boundary.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable code clients can match on, e.g. `QUEUE_FULL`.
    fn error_code(&self) -> &'static str;

    /// The same request may succeed later.
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show to callers.
    fn client_message(&self) -> String;

    /// Internal details (backend errors, hostnames) must not reach the client.
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Payload too large: {size} bytes exceeds max {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Job {0} is not finished yet")]
    NotReady(String),

    #[error("Queue is full: {depth} jobs pending (max {max})")]
    QueueFull { depth: usize, max: usize },

    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Conversion timed out after {0} seconds")]
    ConversionTimeout(u64),

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// (status, code, recoverable, suggested action, sensitive, log level) per variant.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedFormat(_) => (
            415,
            "UNSUPPORTED_FORMAT",
            false,
            Some("Convert the document to a supported format first"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge { .. } => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("The job does not exist or has expired; resubmit the document"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotReady(_) => (
            409,
            "NOT_READY",
            true,
            Some("Poll the job status until it is done"),
            false,
            LogLevel::Debug,
        ),
        AppError::QueueFull { .. } => (
            503,
            "QUEUE_FULL",
            true,
            Some("Wait 30-60 seconds and retry"),
            false,
            LogLevel::Warn,
        ),
        AppError::QueueUnavailable(_) => (
            503,
            "QUEUE_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::StoreUnavailable(_) => (
            503,
            "STORE_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::ConversionTimeout(_) => (
            504,
            "CONVERSION_TIMEOUT",
            true,
            Some("Submit the document asynchronously or reduce its size"),
            false,
            LogLevel::Warn,
        ),
        AppError::ConversionFailed(_) => (
            422,
            "CONVERSION_FAILED",
            false,
            Some("Check that the document is valid"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Variant name, shown next to the details outside production.
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::UnsupportedFormat(_) => "UnsupportedFormat",
            AppError::PayloadTooLarge { .. } => "PayloadTooLarge",
            AppError::NotFound(_) => "NotFound",
            AppError::NotReady(_) => "NotReady",
            AppError::QueueFull { .. } => "QueueFull",
            AppError::QueueUnavailable(_) => "QueueUnavailable",
            AppError::StoreUnavailable(_) => "StoreUnavailable",
            AppError::ConversionTimeout(_) => "ConversionTimeout",
            AppError::ConversionFailed(_) => "ConversionFailed",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Display text followed by up to five `Caused by:` lines.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::UnsupportedFormat(ref msg) => format!("Unsupported format: {}", msg),
            AppError::PayloadTooLarge { max, .. } => {
                format!("File too large. Maximum allowed: {} bytes", max)
            }
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::NotReady(_) => "Job is still being processed".to_string(),
            AppError::QueueFull { .. } => "Too many pending jobs".to_string(),
            AppError::QueueUnavailable(_) => "Job queue unavailable".to_string(),
            AppError::StoreUnavailable(_) => "Job store unavailable".to_string(),
            AppError::ConversionTimeout(secs) => {
                format!("Conversion timed out after {} seconds", secs)
            }
            AppError::ConversionFailed(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_payload_too_large() {
        let err = AppError::PayloadTooLarge {
            size: 2000,
            max: 1000,
        };
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.error_code(), "PAYLOAD_TOO_LARGE");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("1000"));
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_queue_unavailable() {
        let err = AppError::QueueUnavailable("connection refused".to_string());
        assert_eq!(err.http_status_code(), 503);
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Job queue unavailable");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_not_found_and_not_ready_are_distinct() {
        let missing = AppError::NotFound("Job not found or expired".to_string());
        let pending = AppError::NotReady("abc".to_string());
        assert_eq!(missing.http_status_code(), 404);
        assert_eq!(pending.http_status_code(), 409);
        assert_ne!(missing.error_code(), pending.error_code());
        assert!(pending.is_recoverable());
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err: AppError = anyhow::anyhow!("root cause")
            .context("while loading record")
            .into();
        let details = err.detailed_message();
        assert!(details.contains("Internal error"));
        assert!(details.contains("while loading record"));
        assert_eq!(err.client_message(), "Internal server error");
    }
}
