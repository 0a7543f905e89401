//! Data models for the job lifecycle.

mod format;
mod job;

pub use format::SourceFormat;
pub use job::{pdf_filename_for, FailureKind, JobId, JobRecord, JobState, TransitionError};
