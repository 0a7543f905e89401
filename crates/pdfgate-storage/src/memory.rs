//! In-process backends.
//!
//! Suitable for a single process running embedded workers, and for tests. Nothing here
//! survives a restart.

use crate::{JobQueue, MetadataStore, StorageBackend, StorageResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::time::Instant;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Metadata store backed by a `HashMap` with a deadline per entry.
///
/// Expired entries are invisible immediately and physically removed by
/// [`MetadataStore::purge_expired`] or when their key is written again.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physically stored entries, expired ones included.
    pub async fn raw_len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StorageResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry::new(value, ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .await
            .remove(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> StorageResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_live(now)) {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry::new(value, ttl));
        Ok(true)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
        ttl: Duration,
    ) -> StorageResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) && entry.value == expected => {
                entries.insert(key.to_string(), Entry::new(new, ttl));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn scan(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn purge_expired(&self) -> StorageResult<usize> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        Ok(before - entries.len())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<String>,
    in_flight: Vec<String>,
}

/// FIFO queue with an in-flight list, woken through a `Notify`.
#[derive(Default)]
pub struct MemoryQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items dequeued but not yet acked.
    pub async fn in_flight(&self) -> Vec<String> {
        self.state.lock().await.in_flight.clone()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, item: &str) -> StorageResult<()> {
        self.state.lock().await.pending.push_back(item.to_string());
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> StorageResult<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(item) = state.pending.pop_front() {
                    state.in_flight.push(item.clone());
                    let more = !state.pending.is_empty();
                    drop(state);
                    // Pass the wakeup on so a second waiter is not stranded.
                    if more {
                        self.notify.notify_one();
                    }
                    return Ok(Some(item));
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn ack(&self, item: &str) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        if let Some(pos) = state.in_flight.iter().position(|i| i == item) {
            state.in_flight.remove(pos);
        }
        Ok(())
    }

    async fn requeue(&self, item: &str) -> StorageResult<()> {
        {
            let mut state = self.state.lock().await;
            if let Some(pos) = state.in_flight.iter().position(|i| i == item) {
                state.in_flight.remove(pos);
            }
            state.pending.push_back(item.to_string());
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn depth(&self) -> StorageResult<usize> {
        Ok(self.state.lock().await.pending.len())
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
