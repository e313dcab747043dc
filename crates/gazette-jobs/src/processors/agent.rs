//! Agent automation job processor.

use crate::job::Job;
use crate::processor::{JobProcessor, ProcessError, ProcessOutput};
use crate::services::AgentService;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Dispatches automation jobs to the agent backend.
pub struct AgentProcessor {
    service: Arc<dyn AgentService>,
}

impl AgentProcessor {
    /// Wraps the agent capability.
    pub fn new(service: Arc<dyn AgentService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl JobProcessor for AgentProcessor {
    async fn process(
        &self,
        cancel: &CancellationToken,
        job: &Job,
    ) -> Result<ProcessOutput, ProcessError> {
        let task = job
            .job_type
            .strip_prefix("agent_")
            .unwrap_or(&job.job_type);

        debug!(job_id = %job.id, task, "Running agent task");

        tokio::select! {
            _ = cancel.cancelled() => Err(ProcessError::new("cancelled during agent task")),
            result = self.service.run_task(task, &job.payload) => result,
        }
    }

    fn accepted_types(&self) -> Vec<&'static str> {
        // Bare names plus the aliases the typed enqueue wrapper emits.
        vec![
            "agent",
            "webhook",
            "automation",
            "notification",
            "data_sync",
            "agent_webhook",
            "agent_automation",
            "agent_notification",
            "agent_data_sync",
        ]
    }
}
