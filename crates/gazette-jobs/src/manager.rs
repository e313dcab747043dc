//! Process-wide queue orchestrator.
//!
//! The manager owns every named queue and its worker pool, wires
//! processors from the service container, and exposes the cross-queue
//! admin surface. It is constructed once at startup and passed around as
//! a value; call sites that cannot receive it use the reader-writer-
//! guarded global accessor.

use crate::config::{self, queues};
use crate::enqueue;
use crate::error::{QueueError, QueueResult};
use crate::job::{Job, JobStatus, PayloadMap};
use crate::processor::{JobProcessor, ProcessorRegistry};
use crate::processors::{AgentProcessor, TranslationProcessor, VideoProcessor};
use crate::queue::{Queue, QueueStats};
use crate::services::ServiceContainer;
use crate::store::Store;
use crate::worker::{WorkerPool, WorkerPoolStats};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A job and the queue that owns it, as returned by cross-queue lookups.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    /// Owning queue.
    pub queue: String,
    /// The job record.
    pub job: Job,
}

/// Health of one queue.
#[derive(Debug, Clone, Serialize)]
pub struct QueueHealth {
    /// `degraded` when failed jobs outnumber completed ones.
    pub status: HealthStatus,
    /// Jobs waiting in the index.
    pub pending: u64,
    /// Jobs currently executing.
    pub processing: u64,
    /// Terminally failed jobs.
    pub failed: u64,
    /// Most recent completion instant.
    pub last_processed: Option<DateTime<Utc>>,
}

/// Two-state health signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Operating normally.
    Healthy,
    /// Failures outnumber completions somewhere.
    Degraded,
}

/// Health snapshot across every queue.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Degraded if any queue is degraded.
    pub overall: HealthStatus,
    /// Per-queue detail.
    pub queues: HashMap<String, QueueHealth>,
}

/// Owns all named queues and worker pools for the process lifetime.
pub struct QueueManager {
    queues: HashMap<String, Arc<Queue>>,
    pools: HashMap<String, Arc<WorkerPool>>,
    // Search order for cross-queue admin operations.
    names: Vec<&'static str>,
    cancel: CancellationToken,
}

impl QueueManager {
    /// Builds the fixed queue set and wires processors from the service
    /// container. A `None` service leaves its processor unregistered.
    pub fn new(store: Arc<dyn Store>, services: &ServiceContainer) -> Self {
        let cancel = CancellationToken::new();
        let mut queue_map = HashMap::new();
        let mut pools = HashMap::new();
        let mut names = Vec::new();

        for def in config::default_queues() {
            let queue = Arc::new(Queue::new(def.name, store.clone()));

            let mut registry = ProcessorRegistry::new();
            for processor in processors_for(def.name, services) {
                registry.register(processor);
            }

            let pool = Arc::new(WorkerPool::new(
                queue.clone(),
                Arc::new(registry),
                def.workers,
                cancel.child_token(),
            ));

            queue_map.insert(def.name.to_string(), queue);
            pools.insert(def.name.to_string(), pool);
            names.push(def.name);
        }

        Self {
            queues: queue_map,
            pools,
            names,
            cancel,
        }
    }

    /// Launches every worker pool. Returns once they are spawned, not when
    /// work drains.
    pub fn start(&self) -> QueueResult<()> {
        for pool in self.pools.values() {
            pool.start()?;
        }
        info!(queues = self.pools.len(), "Queue manager started");
        Ok(())
    }

    /// Fires the process-wide cancellation signal and waits up to the
    /// shutdown budget for every pool to drain. Pools that miss the
    /// deadline are reported together in the error.
    pub async fn stop(&self) -> QueueResult<()> {
        info!("Stopping queue manager");
        self.cancel.cancel();

        let stops = self
            .pools
            .values()
            .map(|pool| pool.stop(config::SHUTDOWN_TIMEOUT));
        let results = futures::future::join_all(stops).await;

        let failures: Vec<String> = results
            .into_iter()
            .filter_map(Result::err)
            .map(|e| e.to_string())
            .collect();

        if failures.is_empty() {
            info!("Queue manager stopped");
            Ok(())
        } else {
            Err(QueueError::Shutdown(failures.join("; ")))
        }
    }

    /// Enqueues a job on a named queue.
    pub async fn enqueue(&self, queue_name: &str, job: Job) -> QueueResult<String> {
        self.queue(queue_name)?.enqueue(job).await
    }

    /// Enqueues an entity translation job on the `translations` queue.
    pub async fn enqueue_translation(
        &self,
        entity_type: &str,
        entity_id: i64,
        source_lang: &str,
        target_lang: &str,
        priority: i64,
    ) -> QueueResult<String> {
        self.enqueue(
            queues::TRANSLATIONS,
            enqueue::translation_job(entity_type, entity_id, source_lang, target_lang, priority),
        )
        .await
    }

    /// Enqueues a video pipeline job on the `video_processing` queue.
    pub async fn enqueue_video(
        &self,
        job_type: &str,
        video_id: i64,
        priority: i64,
    ) -> QueueResult<String> {
        self.enqueue(
            queues::VIDEO_PROCESSING,
            enqueue::video_job(job_type, video_id, priority),
        )
        .await
    }

    /// Enqueues an automation job on the `agent_tasks` queue.
    pub async fn enqueue_agent(
        &self,
        job_type: &str,
        payload: PayloadMap,
        priority: i64,
    ) -> QueueResult<String> {
        self.enqueue(
            queues::AGENT_TASKS,
            enqueue::agent_job(job_type, payload, priority),
        )
        .await
    }

    /// Finds a job by id, searching every queue in configured order.
    pub async fn get_job_status(&self, id: &str) -> QueueResult<JobSnapshot> {
        for name in &self.names {
            match self.queues[*name].get(id).await {
                Ok(job) => {
                    return Ok(JobSnapshot {
                        queue: (*name).to_string(),
                        job,
                    })
                }
                Err(QueueError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Err(QueueError::NotFound(id.to_string()))
    }

    /// Re-runs a failed job wherever it lives.
    pub async fn retry_job(&self, id: &str) -> QueueResult<()> {
        for name in &self.names {
            match self.queues[*name].retry(id).await {
                Err(QueueError::NotFound(_)) => {}
                result => return result,
            }
        }
        Err(QueueError::NotFound(id.to_string()))
    }

    /// Deletes a terminal job wherever it lives.
    pub async fn delete_job(&self, id: &str) -> QueueResult<()> {
        for name in &self.names {
            match self.queues[*name].delete(id).await {
                Err(QueueError::NotFound(_)) => {}
                result => return result,
            }
        }
        Err(QueueError::NotFound(id.to_string()))
    }

    /// Lists jobs on one queue with a status filter and pagination.
    pub async fn list_jobs(
        &self,
        queue_name: &str,
        status: Option<JobStatus>,
        page: usize,
        limit: usize,
    ) -> QueueResult<(Vec<Job>, usize)> {
        self.queue(queue_name)?.list_jobs(status, page, limit).await
    }

    /// Deletes old terminal jobs on one queue, or on all queues when none
    /// is named. Returns the total removed.
    pub async fn cleanup_old_jobs(
        &self,
        age_hours: i64,
        queue_name: Option<&str>,
    ) -> QueueResult<u64> {
        match queue_name {
            Some(name) => self.queue(name)?.cleanup_old(age_hours).await,
            None => {
                let mut total = 0;
                for name in &self.names {
                    total += self.queues[*name].cleanup_old(age_hours).await?;
                }
                Ok(total)
            }
        }
    }

    /// Stats for every queue.
    pub async fn stats(&self) -> QueueResult<HashMap<String, QueueStats>> {
        let mut all = HashMap::new();
        for name in &self.names {
            all.insert((*name).to_string(), self.queues[*name].stats().await?);
        }
        Ok(all)
    }

    /// Worker pool counters for every queue.
    pub fn pool_stats(&self) -> Vec<WorkerPoolStats> {
        self.names
            .iter()
            .map(|name| self.pools[*name].stats())
            .collect()
    }

    /// Health snapshot. A queue is degraded when its failed jobs outnumber
    /// its completed ones; the overall signal degrades with any queue.
    pub async fn health(&self) -> QueueResult<HealthReport> {
        let mut queues = HashMap::new();
        let mut overall = HealthStatus::Healthy;

        for name in &self.names {
            let stats = self.queues[*name].stats().await?;
            let status = if stats.failed > stats.completed {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            };
            if status == HealthStatus::Degraded {
                overall = HealthStatus::Degraded;
            }
            queues.insert(
                (*name).to_string(),
                QueueHealth {
                    status,
                    pending: stats.pending,
                    processing: stats.processing,
                    failed: stats.failed,
                    last_processed: stats.last_processed,
                },
            );
        }

        Ok(HealthReport { overall, queues })
    }

    fn queue(&self, name: &str) -> QueueResult<&Arc<Queue>> {
        self.queues
            .get(name)
            .ok_or_else(|| QueueError::UnknownQueue(name.to_string()))
    }
}

fn processors_for(
    queue_name: &str,
    services: &ServiceContainer,
) -> Vec<Arc<dyn JobProcessor>> {
    let translation = || {
        services
            .translation
            .clone()
            .map(|svc| Arc::new(TranslationProcessor::new(svc)) as Arc<dyn JobProcessor>)
    };
    let video = || {
        services
            .video
            .clone()
            .map(|svc| Arc::new(VideoProcessor::new(svc)) as Arc<dyn JobProcessor>)
    };
    let agent = || {
        services
            .agent
            .clone()
            .map(|svc| Arc::new(AgentProcessor::new(svc)) as Arc<dyn JobProcessor>)
    };

    match queue_name {
        queues::TRANSLATIONS => translation().into_iter().collect(),
        queues::VIDEO_PROCESSING => video().into_iter().collect(),
        queues::AGENT_TASKS => agent().into_iter().collect(),
        queues::GENERAL => translation().into_iter().chain(agent()).collect(),
        _ => Vec::new(),
    }
}

// The process holds at most one manager. Producers take the read side;
// init and close take the write side.
static GLOBAL_MANAGER: RwLock<Option<Arc<QueueManager>>> = RwLock::new(None);

/// Constructs, starts, and publishes the global manager. Idempotent: a
/// second call returns the existing handle untouched. Must run inside a
/// tokio runtime.
pub fn init_global(
    store: Arc<dyn Store>,
    services: &ServiceContainer,
) -> QueueResult<Arc<QueueManager>> {
    let mut guard = GLOBAL_MANAGER.write();
    if let Some(existing) = guard.as_ref() {
        warn!("Queue manager already initialized");
        return Ok(existing.clone());
    }

    let manager = Arc::new(QueueManager::new(store, services));
    manager.start()?;
    *guard = Some(manager.clone());
    info!("Global queue manager initialized");

    Ok(manager)
}

/// Stops and clears the global manager. A no-op when none is published.
pub async fn close_global() -> QueueResult<()> {
    let manager = GLOBAL_MANAGER.write().take();
    match manager {
        Some(manager) => manager.stop().await,
        None => Ok(()),
    }
}

/// The published manager, if any.
pub fn global() -> Option<Arc<QueueManager>> {
    GLOBAL_MANAGER.read().clone()
}
