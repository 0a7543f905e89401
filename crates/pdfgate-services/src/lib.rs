//! pdfgate Services Layer
//!
//! Business services of the job lifecycle: submission, status and result queries,
//! deletion, the synchronous HTML path, and expiry sweeping. HTTP handling stays in
//! pdfgate-api; the worker loop lives in pdfgate-worker.

pub mod expiry;
pub mod job_store;
pub mod status;
pub mod submission;
pub mod sync;

pub use expiry::{ExpirySweeper, SweepReport};
pub use job_store::{JobSnapshot, JobStore};
pub use pdfgate_processing::{Converter, DocumentConverter};
pub use pdfgate_storage::{JobQueue, MetadataStore, StorageError, StorageResult};
pub use status::{JobResult, StatusService};
pub use submission::{SubmissionService, SubmitRequest, SubmittedJob};
pub use sync::SyncConversionService;
