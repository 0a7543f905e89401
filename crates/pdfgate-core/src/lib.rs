//! pdfgate Core Library
//!
//! This crate provides the domain models, error types, and configuration shared by
//! every pdfgate component: the HTTP API, the worker pool, and the storage backends.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, EngineConfig, JobLimits, WorkerSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{FailureKind, JobId, JobRecord, JobState, SourceFormat};
pub use storage_types::StorageBackend;
