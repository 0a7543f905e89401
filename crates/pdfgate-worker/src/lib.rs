//! pdfgate Worker Library
//!
//! The worker pool drains the job queue, runs conversions under a hard timeout, and writes
//! terminal states back with compare-and-swap so a record is finished exactly once even
//! when a queue item is delivered twice. The lease reaper returns jobs whose worker
//! vanished mid-conversion to the queue.
//!
//! Shutdown: cancel the token passed to [`WorkerPool::start`] and await the returned
//! handle. Workers stop dequeuing immediately and finish their current job first.

pub mod background;
pub mod pool;
pub mod reaper;
pub mod retry;

pub use background::BackgroundTasks;
pub use pool::{worker_id_prefix, WorkerPool, WorkerPoolHandle};
pub use reaper::{LeaseReaper, ReapReport};
