//! Redis-backed store and queue.
//!
//! Expiry is delegated to Redis (`PX` on every write). The queue is a pair of lists: items
//! are `LPUSH`ed onto `{queue}` and atomically moved to `{queue}:processing` by `BLMOVE`
//! until acked.

use crate::{JobQueue, MetadataStore, StorageBackend, StorageError, StorageResult};
use async_trait::async_trait;
use pdfgate_core::constants::PROCESSING_LIST_SUFFIX;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError, Script};
use std::time::Duration;
use tokio::sync::Mutex;

const SCAN_BATCH: usize = 500;

const CAS_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if current == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
    return 1
end
return 0
"#;

impl From<RedisError> for StorageError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            StorageError::Unavailable(err.to_string())
        } else {
            StorageError::BackendError(err.to_string())
        }
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

async fn connect(client: &Client) -> StorageResult<MultiplexedConnection> {
    client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| StorageError::Unavailable(format!("Failed to connect to Redis: {}", e)))
}

fn open_client(redis_url: &str) -> StorageResult<Client> {
    Client::open(redis_url)
        .map_err(|e| StorageError::ConfigError(format!("Invalid REDIS_URL: {}", e)))
}

pub struct RedisStore {
    conn: MultiplexedConnection,
    cas: Script,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> StorageResult<Self> {
        let client = open_client(redis_url)?;
        let conn = connect(&client).await?;
        tracing::info!("Connected Redis metadata store");
        Ok(Self {
            conn,
            cas: Script::new(CAS_SCRIPT),
        })
    }
}

#[async_trait]
impl MetadataStore for RedisStore {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> StorageResult<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
        ttl: Duration,
    ) -> StorageResult<bool> {
        let mut conn = self.conn.clone();
        let swapped: i64 = self
            .cas
            .key(key)
            .arg(expected.to_vec())
            .arg(new)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(swapped == 1)
    }

    async fn scan(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once.
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    async fn ping(&self) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Redis
    }
}

/// Reliable list queue.
///
/// Blocking pops stall the connection they run on, so each `dequeue` borrows a dedicated
/// connection from a small idle pool instead of the shared multiplexed one.
pub struct RedisQueue {
    client: Client,
    conn: MultiplexedConnection,
    blocking: Mutex<Vec<MultiplexedConnection>>,
    pending_key: String,
    processing_key: String,
}

impl RedisQueue {
    pub async fn connect(redis_url: &str, queue_name: &str) -> StorageResult<Self> {
        if queue_name.trim().is_empty() {
            return Err(StorageError::InvalidKey("queue name is empty".to_string()));
        }
        let client = open_client(redis_url)?;
        let conn = connect(&client).await?;
        tracing::info!(queue = %queue_name, "Connected Redis job queue");
        Ok(Self {
            client,
            conn,
            blocking: Mutex::new(Vec::new()),
            pending_key: queue_name.to_string(),
            processing_key: format!("{}{}", queue_name, PROCESSING_LIST_SUFFIX),
        })
    }

    async fn checkout_blocking(&self) -> StorageResult<MultiplexedConnection> {
        if let Some(conn) = self.blocking.lock().await.pop() {
            return Ok(conn);
        }
        connect(&self.client).await
    }

    async fn checkin_blocking(&self, conn: MultiplexedConnection) {
        self.blocking.lock().await.push(conn);
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue(&self, item: &str) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("LPUSH")
            .arg(&self.pending_key)
            .arg(item)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> StorageResult<Option<String>> {
        let mut conn = self.checkout_blocking().await?;
        let result: Result<Option<String>, RedisError> = redis::cmd("BLMOVE")
            .arg(&self.pending_key)
            .arg(&self.processing_key)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await;
        match result {
            Ok(item) => {
                self.checkin_blocking(conn).await;
                Ok(item)
            }
            // A failed connection is dropped rather than returned to the pool.
            Err(e) => Err(e.into()),
        }
    }

    async fn ack(&self, item: &str) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("LREM")
            .arg(&self.processing_key)
            .arg(1)
            .arg(item)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn requeue(&self, item: &str) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("LREM")
            .arg(&self.processing_key)
            .arg(1)
            .arg(item)
            .ignore()
            .cmd("LPUSH")
            .arg(&self.pending_key)
            .arg(item)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn depth(&self) -> StorageResult<usize> {
        let mut conn = self.conn.clone();
        let len: usize = redis::cmd("LLEN")
            .arg(&self.pending_key)
            .query_async(&mut conn)
            .await?;
        Ok(len)
    }

    async fn ping(&self) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Redis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_never_zero() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_secs(3)), 3000);
    }

    #[test]
    fn invalid_url_is_a_config_error() {
        assert!(matches!(
            open_client("not a url"),
            Err(StorageError::ConfigError(_))
        ));
    }
}
