//! Job record and status definitions.

use crate::config;
use crate::error::QueueResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque string-keyed payload attached to a job. Processors extract the
/// fields they expect and fail the job on a mismatch.
pub type PayloadMap = serde_json::Map<String, serde_json::Value>;

/// Named priority levels. Any integer is a valid priority; these are the
/// conventional bands.
pub mod priority {
    /// Background work.
    pub const LOW: i64 = 1;
    /// Default.
    pub const NORMAL: i64 = 5;
    /// Important work.
    pub const HIGH: i64 = 8;
    /// Time-sensitive work.
    pub const CRITICAL: i64 = 10;
}

/// Job status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the priority index.
    Pending,
    /// Popped by a worker and executing.
    Processing,
    /// Finished successfully.
    Completed,
    /// Exhausted its attempts.
    Failed,
    /// Failed with attempts remaining; scheduled for a later run.
    Retrying,
}

impl JobStatus {
    /// Returns true for states that end a job's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Pending
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Retrying => write!(f, "retrying"),
        }
    }
}

/// The unit of work carried by a queue.
///
/// The body hash in the store is the authoritative record; a `Job` value in
/// memory is a working copy owned by whoever is currently mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique within a queue. Generated as `<type>_<nanos>` when empty.
    #[serde(default)]
    pub id: String,

    /// Selects the processor.
    #[serde(rename = "type")]
    pub job_type: String,

    /// Higher pops first.
    pub priority: i64,

    /// Current lifecycle state.
    #[serde(default)]
    pub status: JobStatus,

    /// Failure count so far.
    #[serde(default)]
    pub attempts: u32,

    /// Attempt ceiling; zero means "use the default".
    #[serde(default)]
    pub max_attempts: u32,

    /// Set at first enqueue.
    pub created_at: DateTime<Utc>,

    /// Instant the job becomes eligible to run.
    pub scheduled_at: DateTime<Utc>,

    /// Set when a worker pops the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Set on completion or terminal failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Last failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,

    /// Opaque payload; a `result` entry may be merged in on completion.
    #[serde(default, skip_serializing_if = "PayloadMap::is_empty")]
    pub payload: PayloadMap,
}

impl Job {
    /// Creates a job of the given type with default priority and timing.
    pub fn new(job_type: impl Into<String>, payload: PayloadMap) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            job_type: job_type.into(),
            priority: priority::NORMAL,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: 0,
            created_at: now,
            scheduled_at: now,
            started_at: None,
            completed_at: None,
            error_msg: None,
            payload,
        }
    }

    /// Sets an explicit id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the attempt ceiling.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delays eligibility until the given instant.
    pub fn with_scheduled_at(mut self, scheduled_at: DateTime<Utc>) -> Self {
        self.scheduled_at = scheduled_at;
        self
    }

    /// Fills in whatever the producer left unset. Called on enqueue.
    pub(crate) fn apply_enqueue_defaults(&mut self) {
        if self.id.is_empty() {
            let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
            self.id = format!("{}_{}", self.job_type, nanos);
        }
        if self.max_attempts == 0 {
            self.max_attempts = config::DEFAULT_MAX_ATTEMPTS;
        }
        self.status = JobStatus::Pending;
    }

    /// Serialize to the wire encoding.
    pub fn to_json(&self) -> QueueResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from the wire encoding.
    pub fn from_json(json: &str) -> QueueResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
