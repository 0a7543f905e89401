//! Runs against a live Redis. Enable with `REDIS_URL=redis://... cargo test -- --ignored`.
#![cfg(feature = "storage-redis")]

use pdfgate_storage::{JobQueue, MetadataStore, RedisQueue, RedisStore};
use std::time::Duration;

const TTL: Duration = Duration::from_secs(30);

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string())
}

fn unique(prefix: &str) -> String {
    format!(
        "{}{}",
        prefix,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    )
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn store_operations_are_atomic_per_key() {
    let store = RedisStore::connect(&redis_url()).await.unwrap();
    store.ping().await.unwrap();
    let key = unique("pdfgate_test_meta:");

    assert!(store.put_if_absent(&key, b"a".to_vec(), TTL).await.unwrap());
    assert!(!store.put_if_absent(&key, b"b".to_vec(), TTL).await.unwrap());

    assert!(!store
        .compare_and_swap(&key, b"x", b"c".to_vec(), TTL)
        .await
        .unwrap());
    assert!(store
        .compare_and_swap(&key, b"a", b"c".to_vec(), TTL)
        .await
        .unwrap());
    assert_eq!(store.get(&key).await.unwrap(), Some(b"c".to_vec()));

    let found = store.scan("pdfgate_test_meta:").await.unwrap();
    assert!(found.contains(&key));

    assert!(store.delete(&key).await.unwrap());
    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn keys_expire_with_their_ttl() {
    let store = RedisStore::connect(&redis_url()).await.unwrap();
    let key = unique("pdfgate_test_ttl:");
    store
        .put(&key, b"v".to_vec(), Duration::from_millis(200))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn queue_moves_items_through_processing_list() {
    let name = unique("pdfgate_test_queue:");
    let queue = RedisQueue::connect(&redis_url(), &name).await.unwrap();

    queue.enqueue("a").await.unwrap();
    queue.enqueue("b").await.unwrap();
    assert_eq!(queue.depth().await.unwrap(), 2);

    let first = queue.dequeue(Duration::from_secs(1)).await.unwrap();
    assert_eq!(first.as_deref(), Some("a"));
    queue.requeue("a").await.unwrap();

    let second = queue.dequeue(Duration::from_secs(1)).await.unwrap();
    assert_eq!(second.as_deref(), Some("b"));
    queue.ack("b").await.unwrap();

    let third = queue.dequeue(Duration::from_secs(1)).await.unwrap();
    assert_eq!(third.as_deref(), Some("a"));
    queue.ack("a").await.unwrap();

    let empty = queue.dequeue(Duration::from_millis(100)).await.unwrap();
    assert_eq!(empty, None);
}
