//! Built-in processor shells.
//!
//! Each processor extracts the payload fields it expects and delegates to
//! a capability from the service container. A missing or mistyped field
//! fails the job with a message naming the field.

mod agent;
mod translation;
mod video;

pub use agent::AgentProcessor;
pub use translation::TranslationProcessor;
pub use video::VideoProcessor;

use crate::job::Job;
use crate::processor::ProcessError;

/// Extracts a required string field from the job payload.
pub(crate) fn require_str<'a>(job: &'a Job, field: &str) -> Result<&'a str, ProcessError> {
    match job.payload.get(field) {
        None => Err(ProcessError::new(format!(
            "payload field '{}' is missing",
            field
        ))),
        Some(value) => value.as_str().ok_or_else(|| {
            ProcessError::new(format!("payload field '{}' is not a string", field))
        }),
    }
}

/// Extracts a required integer field from the job payload.
pub(crate) fn require_i64(job: &Job, field: &str) -> Result<i64, ProcessError> {
    match job.payload.get(field) {
        None => Err(ProcessError::new(format!(
            "payload field '{}' is missing",
            field
        ))),
        Some(value) => value.as_i64().ok_or_else(|| {
            ProcessError::new(format!("payload field '{}' is not an integer", field))
        }),
    }
}
