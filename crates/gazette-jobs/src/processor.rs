//! Processor contract and per-queue registry.

use crate::job::{Job, PayloadMap};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Failure reported by a processor. The text becomes the job's `error_msg`.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ProcessError(String);

impl ProcessError {
    /// Wraps a failure message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Optional result map merged into the job payload on completion.
pub type ProcessOutput = Option<PayloadMap>;

/// A handler for one or more job types.
///
/// Implementations may run for a long time and are expected to honour the
/// cancellation token they are handed; the worker does not enforce a
/// per-job deadline.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    /// Executes a job. `Ok` may carry a result map to merge into the
    /// payload; `Err` routes the job through the retry/dead-letter path.
    async fn process(
        &self,
        cancel: &CancellationToken,
        job: &Job,
    ) -> Result<ProcessOutput, ProcessError>;

    /// Job types this processor handles. Read once at registration.
    fn accepted_types(&self) -> Vec<&'static str>;
}

/// Maps job types to processors for one worker pool. Populated during
/// initialization and immutable afterwards, so lookups need no locking.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn JobProcessor>>,
}

impl ProcessorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a processor under every type it accepts.
    pub fn register(&mut self, processor: Arc<dyn JobProcessor>) {
        for job_type in processor.accepted_types() {
            self.processors
                .insert(job_type.to_string(), processor.clone());
            info!(job_type, "Registered job processor");
        }
    }

    /// Looks up the processor for a job type.
    pub fn get(&self, job_type: &str) -> Option<Arc<dyn JobProcessor>> {
        self.processors.get(job_type).cloned()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}
