//! pdfgate Storage Library
//!
//! This crate provides the two shared resources of the job lifecycle: the
//! [`MetadataStore`] (key-value with per-key TTL) and the [`JobQueue`] (FIFO with a
//! blocking pop and an in-flight list). Both have an in-memory backend for single-process
//! deployments and tests, and a Redis backend shared by every API and worker process.
//!
//! # Key layout
//!
//! - `pdf_meta:{id}`: serialized job record
//! - `pdf_result:{id}`: converted PDF bytes
//! - `pdf_input:{id}`: submitted source document
//!
//! Key generation is centralized in the `keys` module so all callers stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-redis")]
pub mod redis_backend;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_backends, Backends};
#[cfg(feature = "storage-memory")]
pub use memory::{MemoryQueue, MemoryStore};
pub use pdfgate_core::StorageBackend;
#[cfg(feature = "storage-redis")]
pub use redis_backend::{RedisQueue, RedisStore};
pub use traits::{JobQueue, MetadataStore, StorageError, StorageResult};
