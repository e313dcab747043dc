//! Queue error types.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors surfaced by the job queue core.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Job not found.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Invalid job state for the requested operation.
    #[error("Invalid job state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Queue name is not configured.
    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    /// No processor registered for a job type.
    #[error("No processor registered for type {0}")]
    NoProcessor(String),

    /// Store configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Worker error.
    #[error("Worker error: {0}")]
    Worker(String),

    /// Shutdown did not complete within the drain budget.
    #[error("Shutdown incomplete: {0}")]
    Shutdown(String),
}

impl QueueError {
    /// Returns true if the error means the backing store is unreachable.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, QueueError::Redis(_) | QueueError::Pool(_))
    }
}
