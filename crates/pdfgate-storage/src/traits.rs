//! Storage abstraction traits
//!
//! The job lifecycle only ever talks to these two traits. Every operation is a single-key
//! atomic step; there are no multi-key transactions.

use crate::StorageBackend;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A stored value that cannot be decoded. Retrying will not help.
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Key-value persistence with per-key TTL.
///
/// Values are opaque bytes. A key whose TTL has elapsed must never be returned by `get`,
/// even if the backend has not physically reclaimed it yet.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StorageResult<()>;

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Atomically store `value` only if `key` is absent. Returns whether it was inserted.
    async fn put_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration)
        -> StorageResult<bool>;

    /// Atomically replace the value of `key` with `new` only if it currently equals
    /// `expected`. Returns whether the swap happened; a missing key never swaps.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
        ttl: Duration,
    ) -> StorageResult<bool>;

    /// Live keys starting with `prefix`, in no particular order.
    async fn scan(&self, prefix: &str) -> StorageResult<Vec<String>>;

    async fn ping(&self) -> StorageResult<()>;

    /// Physically drop expired entries. Returns how many were removed.
    ///
    /// Backends that reclaim on their own keep the default.
    async fn purge_expired(&self) -> StorageResult<usize> {
        Ok(0)
    }

    fn backend_type(&self) -> StorageBackend;
}

/// FIFO hand-off between submission and workers.
///
/// `dequeue` moves an item into an in-flight list instead of dropping it, so a crash
/// between pop and completion does not lose the item. The consumer removes it with
/// `ack` once the job reached a terminal state, or hands it back with `requeue`.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, item: &str) -> StorageResult<()>;

    /// Wait up to `timeout` for an item. `Ok(None)` when nothing arrived in time.
    async fn dequeue(&self, timeout: Duration) -> StorageResult<Option<String>>;

    /// Drop an item from the in-flight list. Acking an unknown item is a no-op.
    async fn ack(&self, item: &str) -> StorageResult<()>;

    /// Move an in-flight item back to the tail of the pending list. An item that is not
    /// in flight is enqueued anyway.
    async fn requeue(&self, item: &str) -> StorageResult<()>;

    /// Number of items waiting to be dequeued.
    async fn depth(&self) -> StorageResult<usize>;

    async fn ping(&self) -> StorageResult<()>;

    fn backend_type(&self) -> StorageBackend;
}

/// Store failures surface as `StoreUnavailable`; queue call sites map to
/// `QueueUnavailable` themselves.
impl From<StorageError> for pdfgate_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConfigError(msg) | StorageError::Corrupt(msg) => {
                pdfgate_core::AppError::Internal(msg)
            }
            other => pdfgate_core::AppError::StoreUnavailable(other.to_string()),
        }
    }
}
