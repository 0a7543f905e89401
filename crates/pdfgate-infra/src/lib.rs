//! pdfgate Infrastructure Library
//!
//! Shared pieces used by both the API server and the standalone worker:
//! - Telemetry initialization (plain or JSON logs)
//! - HTTP middleware (request ID, security headers)
//! - The error response body
//! - Shutdown signal handling

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;
pub mod shutdown;

// Re-export commonly used types
#[cfg(feature = "middleware")]
pub use middleware::{
    get_request_id, request_id_middleware, security_headers_middleware, RequestId,
};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};

pub use error::ErrorResponse;
pub use shutdown::shutdown_signal;
