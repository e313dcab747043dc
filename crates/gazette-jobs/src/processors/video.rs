//! Video pipeline job processor.

use super::require_i64;
use crate::job::Job;
use crate::processor::{JobProcessor, ProcessError, ProcessOutput};
use crate::services::VideoService;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Dispatches video pipeline jobs to the video backend.
pub struct VideoProcessor {
    service: Arc<dyn VideoService>,
}

impl VideoProcessor {
    /// Wraps the video capability.
    pub fn new(service: Arc<dyn VideoService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl JobProcessor for VideoProcessor {
    async fn process(
        &self,
        cancel: &CancellationToken,
        job: &Job,
    ) -> Result<ProcessOutput, ProcessError> {
        let video_id = require_i64(job, "video_id")?;
        let operation = job
            .job_type
            .strip_prefix("video_")
            .unwrap_or(&job.job_type);

        debug!(job_id = %job.id, operation, video_id, "Running video pipeline step");

        tokio::select! {
            _ = cancel.cancelled() => Err(ProcessError::new("cancelled during video processing")),
            result = self.service.process_video(operation, video_id) => result.map(|()| None),
        }
    }

    fn accepted_types(&self) -> Vec<&'static str> {
        // Bare names plus the aliases the typed enqueue wrapper emits.
        vec![
            "video",
            "thumbnail",
            "transcode",
            "analysis",
            "tts",
            "complete_workflow",
            "video_thumbnail",
            "video_transcode",
            "video_analysis",
            "video_tts",
            "video_complete_workflow",
        ]
    }
}
