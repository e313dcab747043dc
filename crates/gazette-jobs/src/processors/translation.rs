//! Translation job processor.

use super::{require_i64, require_str};
use crate::job::Job;
use crate::processor::{JobProcessor, ProcessError, ProcessOutput};
use crate::services::TranslationService;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Dispatches entity translation jobs to the translation backend.
pub struct TranslationProcessor {
    service: Arc<dyn TranslationService>,
}

impl TranslationProcessor {
    /// Wraps the translation capability.
    pub fn new(service: Arc<dyn TranslationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl JobProcessor for TranslationProcessor {
    async fn process(
        &self,
        cancel: &tokio_util::sync::CancellationToken,
        job: &Job,
    ) -> Result<ProcessOutput, ProcessError> {
        let entity_type = require_str(job, "entity_type")?;
        let entity_id = require_i64(job, "entity_id")?;
        let source_lang = require_str(job, "source_lang")?;
        let target_lang = require_str(job, "target_lang")?;

        debug!(
            job_id = %job.id,
            entity_type,
            entity_id,
            source_lang,
            target_lang,
            "Translating entity"
        );

        tokio::select! {
            _ = cancel.cancelled() => Err(ProcessError::new("cancelled during translation")),
            result = self
                .service
                .translate_entity(entity_type, entity_id, source_lang, target_lang) => {
                result.map(|()| None)
            }
        }
    }

    fn accepted_types(&self) -> Vec<&'static str> {
        vec![
            "translation",
            "article_translation",
            "category_translation",
            "tag_translation",
            "menu_translation",
            "notification_translation",
        ]
    }
}
