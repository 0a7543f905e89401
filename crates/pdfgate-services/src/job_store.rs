//! Typed access to job records and blobs on top of a [`MetadataStore`].

use pdfgate_core::{JobId, JobRecord};
use pdfgate_storage::keys::{input_key, meta_key, result_key};
use pdfgate_storage::{MetadataStore, StorageError, StorageResult};
use std::sync::Arc;
use std::time::Duration;

/// A record together with the exact bytes it was read from.
///
/// State transitions compare-and-swap against `raw`, so a snapshot doubles as the
/// precondition of the next write.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub record: JobRecord,
    raw: Vec<u8>,
}

#[derive(Clone)]
pub struct JobStore {
    store: Arc<dyn MetadataStore>,
    ttl: Duration,
}

impl JobStore {
    pub fn new(store: Arc<dyn MetadataStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    pub async fn load(&self, id: &JobId) -> StorageResult<Option<JobSnapshot>> {
        let Some(raw) = self.store.get(&meta_key(id)).await? else {
            return Ok(None);
        };
        let record = JobRecord::from_bytes(&raw).map_err(|e| {
            StorageError::Corrupt(format!("Job record {}: {}", id, e))
        })?;
        Ok(Some(JobSnapshot { record, raw }))
    }

    /// Insert a brand new record. Returns `false` if the id is already taken.
    pub async fn create(&self, record: &JobRecord) -> StorageResult<bool> {
        let bytes = encode(record)?;
        self.store
            .put_if_absent(&meta_key(&record.id), bytes, self.ttl)
            .await
    }

    /// Replace `current` with `next` if nobody changed the record in between.
    ///
    /// Returns the snapshot of the written record, or `None` if the record changed or
    /// disappeared since `current` was read.
    pub async fn transition(
        &self,
        current: &JobSnapshot,
        next: &JobRecord,
    ) -> StorageResult<Option<JobSnapshot>> {
        let bytes = encode(next)?;
        let swapped = self
            .store
            .compare_and_swap(&meta_key(&next.id), &current.raw, bytes.clone(), self.ttl)
            .await?;
        Ok(swapped.then(|| JobSnapshot {
            record: next.clone(),
            raw: bytes,
        }))
    }

    pub async fn delete_record(&self, id: &JobId) -> StorageResult<bool> {
        self.store.delete(&meta_key(id)).await
    }

    pub async fn put_input(&self, id: &JobId, payload: Vec<u8>) -> StorageResult<()> {
        self.store.put(&input_key(id), payload, self.ttl).await
    }

    pub async fn load_input(&self, id: &JobId) -> StorageResult<Option<Vec<u8>>> {
        self.store.get(&input_key(id)).await
    }

    pub async fn delete_input(&self, id: &JobId) -> StorageResult<bool> {
        self.store.delete(&input_key(id)).await
    }

    /// Store the converted PDF. Returns `false` if a result already exists for the job.
    pub async fn put_result(&self, id: &JobId, pdf: Vec<u8>) -> StorageResult<bool> {
        self.store.put_if_absent(&result_key(id), pdf, self.ttl).await
    }

    pub async fn load_result(&self, id: &JobId) -> StorageResult<Option<Vec<u8>>> {
        self.store.get(&result_key(id)).await
    }

    pub async fn delete_result(&self, id: &JobId) -> StorageResult<bool> {
        self.store.delete(&result_key(id)).await
    }

    /// Remove the record and both blobs. Returns whether the record existed.
    pub async fn delete_all(&self, id: &JobId) -> StorageResult<bool> {
        let existed = self.delete_record(id).await?;
        self.delete_result(id).await?;
        self.delete_input(id).await?;
        Ok(existed)
    }
}

fn encode(record: &JobRecord) -> StorageResult<Vec<u8>> {
    record
        .to_bytes()
        .map_err(|e| StorageError::Corrupt(format!("Failed to encode job record: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pdfgate_core::SourceFormat;
    use pdfgate_storage::MemoryStore;

    fn store() -> JobStore {
        JobStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(60))
    }

    fn record() -> JobRecord {
        JobRecord::new_queued(
            JobId::new(),
            "a.docx",
            SourceFormat::Docx,
            false,
            3,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn transition_fails_on_stale_snapshot() {
        let jobs = store();
        let record = record();
        assert!(jobs.create(&record).await.unwrap());
        assert!(!jobs.create(&record).await.unwrap());

        let snapshot = jobs.load(&record.id).await.unwrap().unwrap();
        let lease = chrono::Duration::seconds(30);
        let first = record.start_processing("w1", Utc::now(), lease).unwrap();
        let second = record.start_processing("w2", Utc::now(), lease).unwrap();

        let written = jobs.transition(&snapshot, &first).await.unwrap().unwrap();
        assert_eq!(written.record, first);
        assert!(jobs.transition(&snapshot, &second).await.unwrap().is_none());

        let current = jobs.load(&record.id).await.unwrap().unwrap();
        assert_eq!(current.record, first);
    }

    #[tokio::test]
    async fn delete_all_removes_record_and_blobs() {
        let jobs = store();
        let record = record();
        jobs.create(&record).await.unwrap();
        jobs.put_input(&record.id, b"in".to_vec()).await.unwrap();
        jobs.put_result(&record.id, b"%PDF".to_vec()).await.unwrap();

        assert!(jobs.delete_all(&record.id).await.unwrap());
        assert!(jobs.load(&record.id).await.unwrap().is_none());
        assert!(jobs.load_input(&record.id).await.unwrap().is_none());
        assert!(jobs.load_result(&record.id).await.unwrap().is_none());
        assert!(!jobs.delete_all(&record.id).await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_record_is_reported_as_corrupt() {
        let jobs = store();
        let id = JobId::new();
        jobs.backend()
            .put(&meta_key(&id), b"not json".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            jobs.load(&id).await,
            Err(StorageError::Corrupt(_))
        ));
    }
}
