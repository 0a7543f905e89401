//! Key prefixes and defaults shared by the API, the worker, and the backends.

/// Prefix for serialized job records.
pub const JOB_META_PREFIX: &str = "pdf_meta:";

/// Prefix for converted PDF blobs.
pub const JOB_RESULT_PREFIX: &str = "pdf_result:";

/// Prefix for submitted source documents awaiting conversion.
pub const JOB_INPUT_PREFIX: &str = "pdf_input:";

/// Default queue list name.
pub const DEFAULT_QUEUE_NAME: &str = "pdf_jobs";

/// Suffix appended to the queue name for the in-flight list.
pub const PROCESSING_LIST_SUFFIX: &str = ":processing";

/// Magic bytes every PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Content type of every conversion result.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Filename used when the sync path or a record has no usable name.
pub const DEFAULT_PDF_FILENAME: &str = "document.pdf";
