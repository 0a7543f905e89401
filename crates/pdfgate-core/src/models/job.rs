use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use super::SourceFormat;
use crate::constants::DEFAULT_PDF_FILENAME;

/// Opaque job identifier (random UUID v4, never reused).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        JobId(id)
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(JobId)
    }
}

/// Why a job ended up `failed`.
///
/// `Timeout` and `WorkerLost` are infrastructure outcomes a client may want to resubmit;
/// the other kinds are deterministic for the given input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    ConversionFailed,
    InvalidInput,
    WorkerLost,
}

impl FailureKind {
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureKind::Timeout | FailureKind::WorkerLost)
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::ConversionFailed => write!(f, "conversion_failed"),
            FailureKind::InvalidInput => write!(f, "invalid_input"),
            FailureKind::WorkerLost => write!(f, "worker_lost"),
        }
    }
}

/// Lifecycle state of a job. Each variant carries only the fields valid for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    Queued {
        attempt: u32,
    },
    Processing {
        worker_id: String,
        attempt: u32,
        started_at: DateTime<Utc>,
        lease_expires_at: DateTime<Utc>,
    },
    Done {
        result_ref: String,
        size_bytes: u64,
        completed_at: DateTime<Utc>,
    },
    Failed {
        kind: FailureKind,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trace: Option<String>,
        failed_at: DateTime<Utc>,
    },
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            JobState::Queued { .. } => "queued",
            JobState::Processing { .. } => "processing",
            JobState::Done { .. } => "done",
            JobState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done { .. } | JobState::Failed { .. })
    }
}

/// Rejected state machine edge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid job transition from {from} to {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

/// Persisted state of one conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub filename: String,
    pub source_format: SourceFormat,
    pub as_base64: bool,
    pub input_size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: JobState,
}

impl JobRecord {
    pub fn new_queued(
        id: JobId,
        filename: impl Into<String>,
        source_format: SourceFormat,
        as_base64: bool,
        input_size_bytes: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            filename: filename.into(),
            source_format,
            as_base64,
            input_size_bytes,
            created_at: now,
            updated_at: now,
            state: JobState::Queued { attempt: 0 },
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    fn with_state(&self, state: JobState, now: DateTime<Utc>) -> Self {
        Self {
            state,
            updated_at: now,
            ..self.clone()
        }
    }

    /// `queued -> processing`, owned by `worker_id` until `now + lease`.
    pub fn start_processing(
        &self,
        worker_id: &str,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<Self, TransitionError> {
        match &self.state {
            JobState::Queued { attempt } => Ok(self.with_state(
                JobState::Processing {
                    worker_id: worker_id.to_string(),
                    attempt: *attempt,
                    started_at: now,
                    lease_expires_at: now + lease,
                },
                now,
            )),
            other => Err(TransitionError {
                from: other.name(),
                to: "processing",
            }),
        }
    }

    /// `processing -> done`.
    pub fn complete(
        &self,
        result_ref: impl Into<String>,
        size_bytes: u64,
        now: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        match &self.state {
            JobState::Processing { .. } => Ok(self.with_state(
                JobState::Done {
                    result_ref: result_ref.into(),
                    size_bytes,
                    completed_at: now,
                },
                now,
            )),
            other => Err(TransitionError {
                from: other.name(),
                to: "done",
            }),
        }
    }

    /// `processing -> failed`.
    pub fn fail(
        &self,
        kind: FailureKind,
        error: impl Into<String>,
        trace: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        match &self.state {
            JobState::Processing { .. } => Ok(self.with_state(
                JobState::Failed {
                    kind,
                    error: error.into(),
                    trace,
                    failed_at: now,
                },
                now,
            )),
            other => Err(TransitionError {
                from: other.name(),
                to: "failed",
            }),
        }
    }

    /// `processing -> queued` for a record whose owner stopped renewing it.
    pub fn requeue_abandoned(&self, now: DateTime<Utc>) -> Result<Self, TransitionError> {
        match &self.state {
            JobState::Processing { attempt, .. } => Ok(self.with_state(
                JobState::Queued {
                    attempt: attempt + 1,
                },
                now,
            )),
            other => Err(TransitionError {
                from: other.name(),
                to: "queued",
            }),
        }
    }

    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        match &self.state {
            JobState::Processing {
                lease_expires_at, ..
            } => *lease_expires_at <= now,
            _ => false,
        }
    }

    /// Download name for the converted document: the source name with a `.pdf` extension.
    pub fn pdf_filename(&self) -> String {
        pdf_filename_for(&self.filename)
    }
}

/// Swap a source filename's extension for `.pdf`.
pub fn pdf_filename_for(filename: &str) -> String {
    let name = filename.trim();
    if name.is_empty() {
        return DEFAULT_PDF_FILENAME.to_string();
    }
    if name.to_lowercase().ends_with(".pdf") {
        return name.to_string();
    }
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!("{}.pdf", stem)
}
