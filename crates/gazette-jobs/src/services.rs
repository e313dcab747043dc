//! Capabilities the built-in processors delegate to.
//!
//! The actual implementations (model calls, transcoder invocations,
//! webhook fan-out) live outside this crate; a `None` entry means the
//! matching processor is simply not registered and its jobs fail fast
//! with a no-processor error.

use crate::job::PayloadMap;
use crate::processor::ProcessError;
use async_trait::async_trait;
use std::sync::Arc;

/// Entity translation capability.
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Translates one entity between two languages.
    async fn translate_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<(), ProcessError>;
}

/// Video pipeline capability.
#[async_trait]
pub trait VideoService: Send + Sync {
    /// Runs one pipeline operation (transcode, thumbnail, analysis, tts,
    /// or the complete workflow) against a video.
    async fn process_video(&self, operation: &str, video_id: i64) -> Result<(), ProcessError>;
}

/// Agent automation capability.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Runs one automation task and may return a result map.
    async fn run_task(
        &self,
        task: &str,
        payload: &PayloadMap,
    ) -> Result<Option<PayloadMap>, ProcessError>;
}

/// Capabilities handed to the queue manager at initialization.
#[derive(Default, Clone)]
pub struct ServiceContainer {
    /// Translation backend, if available.
    pub translation: Option<Arc<dyn TranslationService>>,
    /// Video pipeline backend, if available.
    pub video: Option<Arc<dyn VideoService>>,
    /// Agent automation backend, if available.
    pub agent: Option<Arc<dyn AgentService>>,
}

impl ServiceContainer {
    /// A container with no capabilities; every queue runs without
    /// processors and jobs fail fast on dequeue.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sets the translation backend.
    pub fn with_translation(mut self, service: Arc<dyn TranslationService>) -> Self {
        self.translation = Some(service);
        self
    }

    /// Sets the video backend.
    pub fn with_video(mut self, service: Arc<dyn VideoService>) -> Self {
        self.video = Some(service);
        self
    }

    /// Sets the agent backend.
    pub fn with_agent(mut self, service: Arc<dyn AgentService>) -> Self {
        self.agent = Some(service);
        self
    }
}
