//! A single named durable queue.
//!
//! Three persistent artifacts back each queue: a priority index (sorted
//! set), a body hash (job id to serialized record, 24-hour TTL), and a
//! bounded notification list used purely as a wake channel. A fourth, the
//! dead letter list, holds serialized bodies of poison jobs.

use crate::config;
use crate::error::{QueueError, QueueResult};
use crate::job::{Job, JobStatus, PayloadMap};
use crate::metrics;
use crate::store::{QueueKeys, Store, StoreOp};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Score for the priority index. Priority dominates; within a band the
/// time term is subtracted so an earlier schedule ranks higher, and a
/// retry pushed into the future sinks below older pending jobs.
pub(crate) fn priority_score(priority: i64, scheduled_at: DateTime<Utc>) -> f64 {
    priority as f64 * 1_000_000.0 - scheduled_at.timestamp() as f64
}

/// Backoff before attempt `n` runs again: n² whole minutes.
pub(crate) fn retry_backoff(attempts: u32) -> ChronoDuration {
    ChronoDuration::minutes(i64::from(attempts) * i64::from(attempts))
}

/// Counts reported by [`Queue::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    /// Jobs waiting in the priority index (pending and retrying).
    pub pending: u64,
    /// Jobs popped by a worker and executing.
    pub processing: u64,
    /// Jobs finished successfully.
    pub completed: u64,
    /// Jobs that exhausted their attempts.
    pub failed: u64,
    /// Entries in the dead letter lane.
    pub dead: u64,
    /// Most recent completion instant, if any job has completed.
    pub last_processed: Option<DateTime<Utc>>,
}

/// One named durable queue over the shared store.
pub struct Queue {
    name: String,
    store: Arc<dyn Store>,
    keys: QueueKeys,
}

impl Queue {
    /// Binds a queue to its store.
    pub fn new(name: impl Into<String>, store: Arc<dyn Store>) -> Self {
        let name = name.into();
        let keys = QueueKeys::new(&name);
        Self { name, store, keys }
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Durably enqueues a job: body, index entry, and wake notification in
    /// one atomic batch. Fills in defaults the producer left unset and
    /// returns the job id.
    pub async fn enqueue(&self, mut job: Job) -> QueueResult<String> {
        job.apply_enqueue_defaults();
        let body = job.to_json()?;
        let score = priority_score(job.priority, job.scheduled_at);

        self.store
            .pipeline(&[
                StoreOp::HashSet {
                    key: self.keys.bodies(),
                    field: job.id.clone(),
                    value: body,
                },
                StoreOp::SortedAdd {
                    key: self.keys.index(),
                    score,
                    member: job.id.clone(),
                },
                StoreOp::ListPushLeft {
                    key: self.keys.notifications(),
                    value: job.id.clone(),
                },
                StoreOp::ListTrim {
                    key: self.keys.notifications(),
                    start: 0,
                    stop: config::NOTIFICATION_CAP - 1,
                },
                StoreOp::Expire {
                    key: self.keys.bodies(),
                    ttl: config::BODY_TTL,
                },
            ])
            .await?;

        metrics::job_enqueued(&self.name);
        debug!(
            job_id = %job.id,
            queue = %self.name,
            job_type = %job.job_type,
            priority = job.priority,
            "Enqueued job"
        );

        Ok(job.id)
    }

    /// Pops the highest-score eligible job, marks it `processing`, and
    /// returns the working copy. Non-blocking; `None` when the index holds
    /// nothing runnable.
    pub async fn dequeue(&self) -> QueueResult<Option<Job>> {
        loop {
            let Some((id, score)) = self.store.sorted_pop_max(&self.keys.index()).await? else {
                return Ok(None);
            };

            // The body may have expired under the 24-hour TTL, leaving a
            // stale index pointer; drop it and keep popping.
            let Some(body) = self.store.hash_get(&self.keys.bodies(), &id).await? else {
                warn!(job_id = %id, queue = %self.name, "Dropped index entry without a body");
                continue;
            };

            let mut job = match Job::from_json(&body) {
                Ok(job) => job,
                Err(e) => {
                    error!(job_id = %id, queue = %self.name, error = %e, "Dropped undecodable job body");
                    continue;
                }
            };

            // Not yet eligible: put it back with the same score.
            if job.scheduled_at > Utc::now() {
                self.store
                    .pipeline(&[StoreOp::SortedAdd {
                        key: self.keys.index(),
                        score,
                        member: id,
                    }])
                    .await?;
                return Ok(None);
            }

            job.status = JobStatus::Processing;
            job.started_at = Some(Utc::now());
            self.write_body(&job).await?;

            metrics::job_dequeued(&self.name);
            debug!(job_id = %job.id, queue = %self.name, job_type = %job.job_type, "Dequeued job");

            return Ok(Some(job));
        }
    }

    /// Like [`dequeue`](Self::dequeue), but parks on the notification list
    /// up to `timeout` when nothing is immediately available. Returns
    /// `None` on timeout or when `cancel` fires.
    ///
    /// The notification is a hint, not a reservation: several workers may
    /// wake for one job and race on the atomic pop; the losers get `None`
    /// and re-block.
    pub async fn blocking_dequeue(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> QueueResult<Option<Job>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        if let Some(job) = self.dequeue().await? {
            return Ok(Some(job));
        }

        let notifications = self.keys.notifications();
        let woke = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            popped = self.store.blocking_pop_left(&notifications, timeout) => popped?,
        };

        match woke {
            Some(_) => self.dequeue().await,
            None => Ok(None),
        }
    }

    /// Marks a job completed, optionally merging a `result` entry into its
    /// payload. Idempotent on an already-completed job.
    pub async fn complete(&self, id: &str, result: Option<PayloadMap>) -> QueueResult<()> {
        let mut job = self.get(id).await?;

        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        if let Some(result) = result {
            job.payload
                .insert("result".to_string(), serde_json::Value::Object(result));
        }
        self.write_body(&job).await?;

        metrics::job_completed(&self.name);
        debug!(job_id = %id, queue = %self.name, "Completed job");

        Ok(())
    }

    /// Records a failure. With attempts remaining the job is re-scheduled
    /// with quadratic backoff; otherwise it goes terminally `failed` and a
    /// serialized copy lands on the dead letter lane.
    pub async fn fail(&self, id: &str, error_msg: &str) -> QueueResult<()> {
        let mut job = self.get(id).await?;

        job.attempts += 1;
        job.error_msg = Some(error_msg.to_string());

        if job.attempts < job.max_attempts {
            job.status = JobStatus::Retrying;
            job.scheduled_at = Utc::now() + retry_backoff(job.attempts);
            let score = priority_score(job.priority, job.scheduled_at);
            let body = job.to_json()?;

            self.store
                .pipeline(&[
                    StoreOp::HashSet {
                        key: self.keys.bodies(),
                        field: job.id.clone(),
                        value: body,
                    },
                    StoreOp::SortedAdd {
                        key: self.keys.index(),
                        score,
                        member: job.id.clone(),
                    },
                    StoreOp::Expire {
                        key: self.keys.bodies(),
                        ttl: config::BODY_TTL,
                    },
                ])
                .await?;

            metrics::job_retried(&self.name);
            warn!(
                job_id = %id,
                queue = %self.name,
                attempt = job.attempts,
                retry_at = %job.scheduled_at,
                error = %error_msg,
                "Job failed, retry scheduled"
            );
        } else {
            job.status = JobStatus::Failed;
            job.completed_at = Some(Utc::now());
            let body = job.to_json()?;

            // The index entry is normally gone (the job was popped), but a
            // failure recorded against a never-popped job must not leave a
            // terminal id in the index.
            self.store
                .pipeline(&[
                    StoreOp::HashSet {
                        key: self.keys.bodies(),
                        field: job.id.clone(),
                        value: body.clone(),
                    },
                    StoreOp::SortedRemove {
                        key: self.keys.index(),
                        members: vec![job.id.clone()],
                    },
                    StoreOp::ListPushLeft {
                        key: self.keys.dead_letter(),
                        value: body,
                    },
                    StoreOp::Expire {
                        key: self.keys.bodies(),
                        ttl: config::BODY_TTL,
                    },
                ])
                .await?;

            metrics::job_failed(&self.name);
            metrics::job_dead_lettered(&self.name);
            error!(
                job_id = %id,
                queue = %self.name,
                attempts = job.attempts,
                error = %error_msg,
                "Job failed terminally"
            );
        }

        Ok(())
    }

    /// Banishes a job: pushes its serialized body onto the dead letter
    /// lane and removes it from the body hash and priority index.
    pub async fn move_to_dead_letter(&self, id: &str) -> QueueResult<()> {
        let job = self.get(id).await?;
        let body = job.to_json()?;

        self.store
            .pipeline(&[
                StoreOp::ListPushLeft {
                    key: self.keys.dead_letter(),
                    value: body,
                },
                StoreOp::HashDelete {
                    key: self.keys.bodies(),
                    fields: vec![job.id.clone()],
                },
                StoreOp::SortedRemove {
                    key: self.keys.index(),
                    members: vec![job.id.clone()],
                },
            ])
            .await?;

        metrics::job_dead_lettered(&self.name);
        warn!(job_id = %id, queue = %self.name, "Moved job to dead letter");

        Ok(())
    }

    /// Loads a job snapshot from the body hash.
    pub async fn get(&self, id: &str) -> QueueResult<Job> {
        match self.store.hash_get(&self.keys.bodies(), id).await? {
            Some(body) => Job::from_json(&body),
            None => Err(QueueError::NotFound(id.to_string())),
        }
    }

    /// Scans the body hash, filters by status, and returns one page plus
    /// the filtered total. Page numbers are 1-based.
    pub async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        page: usize,
        limit: usize,
    ) -> QueueResult<(Vec<Job>, usize)> {
        let entries = self.store.hash_get_all(&self.keys.bodies()).await?;

        let mut jobs: Vec<Job> = entries
            .values()
            .filter_map(|body| Job::from_json(body).ok())
            .filter(|job| status.map_or(true, |s| job.status == s))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = jobs.len();
        let start = page.max(1).saturating_sub(1).saturating_mul(limit);
        let page_jobs = jobs.into_iter().skip(start).take(limit).collect();

        Ok((page_jobs, total))
    }

    /// Re-runs a terminally failed job: resets it to `pending` and puts it
    /// back in the index with a fresh score. Only valid on `failed` jobs.
    pub async fn retry(&self, id: &str) -> QueueResult<()> {
        let mut job = self.get(id).await?;

        if job.status != JobStatus::Failed {
            return Err(QueueError::InvalidState {
                expected: "failed".to_string(),
                actual: job.status.to_string(),
            });
        }

        job.status = JobStatus::Pending;
        job.error_msg = None;
        job.started_at = None;
        job.completed_at = None;
        job.scheduled_at = Utc::now();

        let score = priority_score(job.priority, job.scheduled_at);
        let body = job.to_json()?;

        self.store
            .pipeline(&[
                StoreOp::HashSet {
                    key: self.keys.bodies(),
                    field: job.id.clone(),
                    value: body,
                },
                StoreOp::SortedAdd {
                    key: self.keys.index(),
                    score,
                    member: job.id.clone(),
                },
                StoreOp::ListPushLeft {
                    key: self.keys.notifications(),
                    value: job.id.clone(),
                },
                StoreOp::ListTrim {
                    key: self.keys.notifications(),
                    start: 0,
                    stop: config::NOTIFICATION_CAP - 1,
                },
                StoreOp::Expire {
                    key: self.keys.bodies(),
                    ttl: config::BODY_TTL,
                },
            ])
            .await?;

        info!(job_id = %id, queue = %self.name, "Re-enqueued failed job");

        Ok(())
    }

    /// Removes a job from the body hash and index. Refused while the job
    /// is `pending` or `processing` (it would leak a worker or corrupt the
    /// index ordering guarantees).
    pub async fn delete(&self, id: &str) -> QueueResult<()> {
        let job = self.get(id).await?;

        if matches!(job.status, JobStatus::Pending | JobStatus::Processing) {
            return Err(QueueError::InvalidState {
                expected: "completed, failed or retrying".to_string(),
                actual: job.status.to_string(),
            });
        }

        self.store
            .pipeline(&[
                StoreOp::HashDelete {
                    key: self.keys.bodies(),
                    fields: vec![job.id.clone()],
                },
                StoreOp::SortedRemove {
                    key: self.keys.index(),
                    members: vec![job.id.clone()],
                },
            ])
            .await?;

        debug!(job_id = %id, queue = %self.name, "Deleted job");

        Ok(())
    }

    /// Deletes terminal jobs whose completion is older than `age_hours`.
    /// Returns how many were removed.
    pub async fn cleanup_old(&self, age_hours: i64) -> QueueResult<u64> {
        let cutoff = Utc::now() - ChronoDuration::hours(age_hours);
        let entries = self.store.hash_get_all(&self.keys.bodies()).await?;

        let expired: Vec<String> = entries
            .values()
            .filter_map(|body| Job::from_json(body).ok())
            .filter(|job| {
                job.status.is_terminal() && job.completed_at.is_some_and(|at| at < cutoff)
            })
            .map(|job| job.id)
            .collect();

        if expired.is_empty() {
            return Ok(0);
        }

        let count = expired.len() as u64;
        self.store
            .pipeline(&[
                StoreOp::HashDelete {
                    key: self.keys.bodies(),
                    fields: expired.clone(),
                },
                StoreOp::SortedRemove {
                    key: self.keys.index(),
                    members: expired,
                },
            ])
            .await?;

        metrics::jobs_cleaned(&self.name, count);
        info!(queue = %self.name, count, "Cleaned up old jobs");

        Ok(count)
    }

    /// Counts per status. `pending` comes from the index cardinality, the
    /// dead count from the dead letter list; the rest scan the body hash.
    pub async fn stats(&self) -> QueueResult<QueueStats> {
        let pending = self.store.sorted_card(&self.keys.index()).await?;
        let dead = self.store.list_len(&self.keys.dead_letter()).await?;
        let entries = self.store.hash_get_all(&self.keys.bodies()).await?;

        let mut processing = 0;
        let mut completed = 0;
        let mut failed = 0;
        let mut last_processed: Option<DateTime<Utc>> = None;

        for job in entries.values().filter_map(|b| Job::from_json(b).ok()) {
            match job.status {
                JobStatus::Processing => processing += 1,
                JobStatus::Completed => {
                    completed += 1;
                    if job.completed_at > last_processed {
                        last_processed = job.completed_at;
                    }
                }
                JobStatus::Failed => failed += 1,
                JobStatus::Pending | JobStatus::Retrying => {}
            }
        }

        Ok(QueueStats {
            pending,
            processing,
            completed,
            failed,
            dead,
            last_processed,
        })
    }

    async fn write_body(&self, job: &Job) -> QueueResult<()> {
        let body = job.to_json()?;
        self.store
            .pipeline(&[
                StoreOp::HashSet {
                    key: self.keys.bodies(),
                    field: job.id.clone(),
                    value: body,
                },
                StoreOp::Expire {
                    key: self.keys.bodies(),
                    ttl: config::BODY_TTL,
                },
            ])
            .await
    }
}
