#[cfg(feature = "storage-memory")]
use crate::{MemoryQueue, MemoryStore};
#[cfg(feature = "storage-redis")]
use crate::{RedisQueue, RedisStore};
use crate::{JobQueue, MetadataStore, StorageBackend, StorageError, StorageResult};
use pdfgate_core::Config;
use std::sync::Arc;

/// Store and queue selected by configuration.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn MetadataStore>,
    pub queue: Arc<dyn JobQueue>,
}

/// Create the metadata store and job queue based on configuration
pub async fn create_backends(config: &Config) -> StorageResult<Backends> {
    match config.storage_backend {
        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => Ok(Backends {
            store: Arc::new(MemoryStore::new()),
            queue: Arc::new(MemoryQueue::new()),
        }),

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory backend not available (storage-memory feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-redis")]
        StorageBackend::Redis => {
            if config.redis_url.is_empty() {
                return Err(StorageError::ConfigError(
                    "REDIS_URL not configured".to_string(),
                ));
            }
            let store = RedisStore::connect(&config.redis_url).await?;
            let queue = RedisQueue::connect(&config.redis_url, &config.queue_name).await?;
            Ok(Backends {
                store: Arc::new(store),
                queue: Arc::new(queue),
            })
        }

        #[cfg(not(feature = "storage-redis"))]
        StorageBackend::Redis => Err(StorageError::ConfigError(
            "Redis backend not available (storage-redis feature not enabled)".to_string(),
        )),
    }
}

#[cfg(all(test, feature = "storage-memory"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_builds_memory_backends() {
        let backends = create_backends(&Config::default()).await.unwrap();
        assert_eq!(backends.store.backend_type(), StorageBackend::Memory);
        assert_eq!(backends.queue.backend_type(), StorageBackend::Memory);
        backends.store.ping().await.unwrap();
        backends.queue.ping().await.unwrap();
    }
}
