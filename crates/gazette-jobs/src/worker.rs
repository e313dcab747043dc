//! Worker pool for one queue.
//!
//! A pool spawns a fixed number of workers. Each worker parks on the
//! queue's notification channel, pops the top-priority job when woken,
//! looks up the processor for its type, and records the outcome. Errors
//! never stop a worker: they become job state transitions and log lines.

use crate::config;
use crate::error::{QueueError, QueueResult};
use crate::job::Job;
use crate::processor::ProcessorRegistry;
use crate::queue::Queue;
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

/// Snapshot of a pool's counters.
#[derive(Debug, Clone)]
pub struct WorkerPoolStats {
    /// Queue the pool serves.
    pub queue: String,
    /// Whether the pool has been started and not yet stopped.
    pub running: bool,
    /// Configured worker count.
    pub concurrency: usize,
    /// Jobs completed by this pool.
    pub jobs_processed: u64,
    /// Jobs that failed in this pool (including missing processors).
    pub jobs_failed: u64,
}

/// Fixed-size group of workers bound to one queue.
pub struct WorkerPool {
    queue: Arc<Queue>,
    registry: Arc<ProcessorRegistry>,
    concurrency: usize,
    cancel: CancellationToken,
    running: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
    jobs_processed: Arc<AtomicU64>,
    jobs_failed: Arc<AtomicU64>,
}

impl WorkerPool {
    /// Binds a pool to its queue and processor registry.
    pub fn new(
        queue: Arc<Queue>,
        registry: Arc<ProcessorRegistry>,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            registry,
            concurrency,
            cancel,
            running: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
            jobs_processed: Arc::new(AtomicU64::new(0)),
            jobs_failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawns the workers. Returns immediately; the workers run until the
    /// cancellation signal fires.
    pub fn start(&self) -> QueueResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(QueueError::Worker(format!(
                "worker pool for queue '{}' already running",
                self.queue.name()
            )));
        }

        if self.registry.is_empty() {
            warn!(
                queue = %self.queue.name(),
                "No processors registered; jobs on this queue will fail on dequeue"
            );
        }

        info!(
            queue = %self.queue.name(),
            concurrency = self.concurrency,
            "Starting worker pool"
        );

        let mut handles = self.handles.lock();
        for _ in 0..self.concurrency {
            let worker_id = format!("{}-{}", self.queue.name(), Uuid::new_v4());
            let span = tracing::info_span!("worker", worker_id = %worker_id);
            handles.push(tokio::spawn(
                run_worker(
                    worker_id,
                    self.queue.clone(),
                    self.registry.clone(),
                    self.cancel.clone(),
                    self.jobs_processed.clone(),
                    self.jobs_failed.clone(),
                )
                .instrument(span),
            ));
        }

        Ok(())
    }

    /// Fires the cancellation signal and waits up to `drain_timeout` for
    /// every worker to finish its in-flight job and exit.
    pub async fn stop(&self, drain_timeout: Duration) -> QueueResult<()> {
        self.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        let drained =
            tokio::time::timeout(drain_timeout, futures::future::join_all(handles)).await;

        self.running.store(false, Ordering::SeqCst);

        match drained {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        error!(queue = %self.queue.name(), error = %e, "Worker task aborted");
                    }
                }
                info!(
                    queue = %self.queue.name(),
                    processed = self.jobs_processed.load(Ordering::Relaxed),
                    failed = self.jobs_failed.load(Ordering::Relaxed),
                    "Worker pool stopped"
                );
                Ok(())
            }
            Err(_) => Err(QueueError::Shutdown(format!(
                "queue '{}': workers still running after {:?}",
                self.queue.name(),
                drain_timeout
            ))),
        }
    }

    /// True between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Counter snapshot.
    pub fn stats(&self) -> WorkerPoolStats {
        WorkerPoolStats {
            queue: self.queue.name().to_string(),
            running: self.is_running(),
            concurrency: self.concurrency,
            jobs_processed: self.jobs_processed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
        }
    }
}

async fn run_worker(
    worker_id: String,
    queue: Arc<Queue>,
    registry: Arc<ProcessorRegistry>,
    cancel: CancellationToken,
    jobs_processed: Arc<AtomicU64>,
    jobs_failed: Arc<AtomicU64>,
) {
    debug!(queue = %queue.name(), "Worker started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match queue.blocking_dequeue(config::DEQUEUE_TIMEOUT, &cancel).await {
            Ok(Some(job)) => {
                process_job(
                    &worker_id,
                    &queue,
                    &registry,
                    &cancel,
                    job,
                    &jobs_processed,
                    &jobs_failed,
                )
                .await;
            }
            // Timed out, lost a wakeup race, or cancelled: loop re-checks.
            Ok(None) => {}
            Err(e) => {
                error!(queue = %queue.name(), error = %e, "Dequeue failed");
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
        }
    }

    debug!(queue = %queue.name(), "Worker stopped");
}

async fn process_job(
    worker_id: &str,
    queue: &Queue,
    registry: &ProcessorRegistry,
    cancel: &CancellationToken,
    job: Job,
    jobs_processed: &AtomicU64,
    jobs_failed: &AtomicU64,
) {
    let Some(processor) = registry.get(&job.job_type) else {
        let reason = QueueError::NoProcessor(job.job_type.clone()).to_string();
        warn!(job_id = %job.id, queue = %queue.name(), job_type = %job.job_type, "{}", reason);
        record_failure(queue, &job.id, &reason).await;
        jobs_failed.fetch_add(1, Ordering::Relaxed);
        return;
    };

    debug!(
        job_id = %job.id,
        queue = %queue.name(),
        job_type = %job.job_type,
        worker_id,
        attempt = job.attempts + 1,
        "Processing job"
    );

    let outcome = AssertUnwindSafe(processor.process(cancel, &job))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(result)) => {
            if let Err(e) = queue.complete(&job.id, result).await {
                // Soft leak: the job stays `processing` in the body hash.
                error!(job_id = %job.id, queue = %queue.name(), error = %e, "Failed to record completion");
            }
            jobs_processed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(process_err)) => {
            warn!(job_id = %job.id, queue = %queue.name(), error = %process_err, "Job execution failed");
            record_failure(queue, &job.id, &process_err.to_string()).await;
            jobs_failed.fetch_add(1, Ordering::Relaxed);
        }
        Err(panic) => {
            let reason = format!("processor panicked: {}", panic_message(panic.as_ref()));
            error!(job_id = %job.id, queue = %queue.name(), "{}", reason);
            record_failure(queue, &job.id, &reason).await;
            jobs_failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

async fn record_failure(queue: &Queue, job_id: &str, reason: &str) {
    if let Err(e) = queue.fail(job_id, reason).await {
        // Soft leak, same as a lost completion.
        error!(job_id = %job_id, queue = %queue.name(), error = %e, "Failed to record failure");
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
