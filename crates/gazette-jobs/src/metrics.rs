//! Queue metrics.

use metrics::{counter, describe_counter};

/// Metric names for the job queue.
pub mod names {
    /// Total jobs enqueued.
    pub const JOBS_ENQUEUED_TOTAL: &str = "gazette_jobs_enqueued_total";
    /// Total jobs dequeued for processing.
    pub const JOBS_DEQUEUED_TOTAL: &str = "gazette_jobs_dequeued_total";
    /// Total jobs completed successfully.
    pub const JOBS_COMPLETED_TOTAL: &str = "gazette_jobs_completed_total";
    /// Total jobs failed terminally.
    pub const JOBS_FAILED_TOTAL: &str = "gazette_jobs_failed_total";
    /// Total retry schedulings.
    pub const JOBS_RETRIED_TOTAL: &str = "gazette_jobs_retried_total";
    /// Total jobs pushed to the dead letter lane.
    pub const JOBS_DEAD_LETTERED_TOTAL: &str = "gazette_jobs_dead_lettered_total";
    /// Total jobs removed by cleanup.
    pub const JOBS_CLEANED_TOTAL: &str = "gazette_jobs_cleaned_total";
}

/// Register metric descriptions with the installed recorder.
pub fn register_metrics() {
    describe_counter!(names::JOBS_ENQUEUED_TOTAL, "Total number of jobs enqueued");
    describe_counter!(
        names::JOBS_DEQUEUED_TOTAL,
        "Total number of jobs dequeued for processing"
    );
    describe_counter!(
        names::JOBS_COMPLETED_TOTAL,
        "Total number of jobs completed successfully"
    );
    describe_counter!(
        names::JOBS_FAILED_TOTAL,
        "Total number of jobs that failed terminally"
    );
    describe_counter!(names::JOBS_RETRIED_TOTAL, "Total number of retry schedulings");
    describe_counter!(
        names::JOBS_DEAD_LETTERED_TOTAL,
        "Total number of jobs pushed to the dead letter lane"
    );
    describe_counter!(
        names::JOBS_CLEANED_TOTAL,
        "Total number of jobs removed by cleanup"
    );
}

pub(crate) fn job_enqueued(queue: &str) {
    counter!(names::JOBS_ENQUEUED_TOTAL, "queue" => queue.to_string()).increment(1);
}

pub(crate) fn job_dequeued(queue: &str) {
    counter!(names::JOBS_DEQUEUED_TOTAL, "queue" => queue.to_string()).increment(1);
}

pub(crate) fn job_completed(queue: &str) {
    counter!(names::JOBS_COMPLETED_TOTAL, "queue" => queue.to_string()).increment(1);
}

pub(crate) fn job_failed(queue: &str) {
    counter!(names::JOBS_FAILED_TOTAL, "queue" => queue.to_string()).increment(1);
}

pub(crate) fn job_retried(queue: &str) {
    counter!(names::JOBS_RETRIED_TOTAL, "queue" => queue.to_string()).increment(1);
}

pub(crate) fn job_dead_lettered(queue: &str) {
    counter!(names::JOBS_DEAD_LETTERED_TOTAL, "queue" => queue.to_string()).increment(1);
}

pub(crate) fn jobs_cleaned(queue: &str, count: u64) {
    counter!(names::JOBS_CLEANED_TOTAL, "queue" => queue.to_string()).increment(count);
}
