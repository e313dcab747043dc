//! Compiled-in queue configuration.
//!
//! The queue topology is fixed at build time: queue names, worker counts,
//! and processor bindings are constants. The core reads no environment
//! variables, flags, or config files.

use std::time::Duration;

/// Names of the configured queues.
pub mod queues {
    /// Translation jobs (articles, categories, tags, menus, notifications).
    pub const TRANSLATIONS: &str = "translations";
    /// Video pipeline jobs (transcode, thumbnail, analysis, tts).
    pub const VIDEO_PROCESSING: &str = "video_processing";
    /// Agent automation jobs (webhooks, automations, data sync).
    pub const AGENT_TASKS: &str = "agent_tasks";
    /// Mixed lane served by the translation and agent processors.
    pub const GENERAL: &str = "general";
}

/// Default `max_attempts` applied when a job is enqueued with zero.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// TTL on the job body hash, refreshed on every write.
pub const BODY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Maximum length of the notification wake list.
pub const NOTIFICATION_CAP: i64 = 100;

/// How long a worker blocks on the notification list before re-checking
/// its cancellation signal.
pub const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long `QueueManager::stop` waits for workers to drain in-flight jobs.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// A queue and the size of its worker pool.
#[derive(Debug, Clone, Copy)]
pub struct QueueDefinition {
    /// Queue name.
    pub name: &'static str,
    /// Number of concurrent workers.
    pub workers: usize,
}

/// The fixed set of queues this process runs.
pub fn default_queues() -> [QueueDefinition; 4] {
    [
        QueueDefinition {
            name: queues::TRANSLATIONS,
            workers: 3,
        },
        QueueDefinition {
            name: queues::VIDEO_PROCESSING,
            workers: 2,
        },
        QueueDefinition {
            name: queues::AGENT_TASKS,
            workers: 2,
        },
        QueueDefinition {
            name: queues::GENERAL,
            workers: 3,
        },
    ]
}
