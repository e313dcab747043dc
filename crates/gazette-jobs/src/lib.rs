//! Gazette Jobs - Persistent Priority Job Queue
//!
//! A Redis-backed job queue with:
//! - Per-queue worker pools with fixed concurrency
//! - Caller-assigned priorities with schedule-time tie-breaking
//! - Bounded retries with quadratic backoff
//! - A dead letter lane for poison jobs
//! - A notification channel so idle workers block instead of polling
//! - Cross-queue admin operations and health reporting
//!
//! # Architecture
//!
//! ```text
//! Producer ──► QueueManager::enqueue ──► Queue
//!                                         │  body hash (jobs:<name>)
//!                                         │  priority index (queue:<name>)
//!                                         │  wake list (notifications:<name>)
//!                                         ▼
//!                        Worker ◄── blocking_dequeue
//!                          │
//!                          ├─► ProcessorRegistry lookup by job type
//!                          ├─► JobProcessor::process
//!                          ▼
//!              complete ── or ── fail ──► retry with backoff
//!                                   └───► dead_letter:<name>
//! ```
//!
//! The store is the authoritative shared record; in-memory `Job` values
//! are working copies. Enqueue and dequeue are atomic at the store level,
//! so any number of producers and workers may act on a queue concurrently.

pub mod config;
pub mod enqueue;
pub mod error;
pub mod job;
pub mod manager;
pub mod metrics;
pub mod processor;
pub mod processors;
pub mod queue;
pub mod services;
pub mod store;
pub mod worker;

pub use error::{QueueError, QueueResult};
pub use job::{priority, Job, JobStatus, PayloadMap};
pub use manager::{
    close_global, global, init_global, HealthReport, HealthStatus, JobSnapshot, QueueHealth,
    QueueManager,
};
pub use metrics::register_metrics;
pub use processor::{JobProcessor, ProcessError, ProcessOutput, ProcessorRegistry};
pub use processors::{AgentProcessor, TranslationProcessor, VideoProcessor};
pub use queue::{Queue, QueueStats};
pub use services::{AgentService, ServiceContainer, TranslationService, VideoService};
pub use store::{create_pool, QueueKeys, RedisStore, Store, StoreOp};
pub use worker::{WorkerPool, WorkerPoolStats};

/// Re-export of the commonly used types.
pub mod prelude {
    pub use crate::error::{QueueError, QueueResult};
    pub use crate::job::{priority, Job, JobStatus, PayloadMap};
    pub use crate::manager::QueueManager;
    pub use crate::processor::{JobProcessor, ProcessError};
    pub use crate::services::ServiceContainer;
    pub use crate::store::Store;
}
