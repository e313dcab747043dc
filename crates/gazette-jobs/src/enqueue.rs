//! Typed job factories for the common job families.
//!
//! These build well-formed records; the manager's wrappers enqueue them on
//! the correct queue.

use crate::job::{Job, PayloadMap};
use serde_json::json;

/// An entity translation job for the `translations` queue.
pub fn translation_job(
    entity_type: &str,
    entity_id: i64,
    source_lang: &str,
    target_lang: &str,
    priority: i64,
) -> Job {
    let mut payload = PayloadMap::new();
    payload.insert("entity_type".to_string(), json!(entity_type));
    payload.insert("entity_id".to_string(), json!(entity_id));
    payload.insert("source_lang".to_string(), json!(source_lang));
    payload.insert("target_lang".to_string(), json!(target_lang));

    Job::new("translation", payload).with_priority(priority)
}

/// A video pipeline job for the `video_processing` queue.
pub fn video_job(job_type: &str, video_id: i64, priority: i64) -> Job {
    let mut payload = PayloadMap::new();
    payload.insert("video_id".to_string(), json!(video_id));

    Job::new(format!("video_{}", job_type), payload).with_priority(priority)
}

/// An automation job for the `agent_tasks` queue.
pub fn agent_job(job_type: &str, payload: PayloadMap, priority: i64) -> Job {
    Job::new(format!("agent_{}", job_type), payload).with_priority(priority)
}
