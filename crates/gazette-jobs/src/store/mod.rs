//! Store adapter contract.
//!
//! Everything the queue persists goes through this trait; no caller touches
//! the store's wire API directly. The production implementation is
//! [`redis::RedisStore`]; the test suite runs against an in-memory store
//! with the same semantics.

mod redis;

#[cfg(test)]
pub(crate) mod memory;

pub use redis::{create_pool, RedisStore};

use crate::error::QueueResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// One mutation inside an atomic batch.
#[derive(Debug, Clone)]
pub enum StoreOp {
    /// Add (or re-score) a member of a sorted set.
    SortedAdd {
        key: String,
        score: f64,
        member: String,
    },
    /// Remove members from a sorted set.
    SortedRemove { key: String, members: Vec<String> },
    /// Set a hash field.
    HashSet {
        key: String,
        field: String,
        value: String,
    },
    /// Delete hash fields.
    HashDelete { key: String, fields: Vec<String> },
    /// Push a value onto the head of a list.
    ListPushLeft { key: String, value: String },
    /// Trim a list to the given inclusive range.
    ListTrim { key: String, start: i64, stop: i64 },
    /// Set a key's TTL.
    Expire { key: String, ttl: Duration },
}

/// Thin contract over the shared key-value store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Add a member to a sorted set, replacing its score if present.
    async fn sorted_add(&self, key: &str, score: f64, member: &str) -> QueueResult<()>;

    /// Atomically pop the member with the highest score.
    async fn sorted_pop_max(&self, key: &str) -> QueueResult<Option<(String, f64)>>;

    /// Remove members from a sorted set; returns how many were present.
    async fn sorted_remove(&self, key: &str, members: &[String]) -> QueueResult<u64>;

    /// Cardinality of a sorted set.
    async fn sorted_card(&self, key: &str) -> QueueResult<u64>;

    /// Set a hash field.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> QueueResult<()>;

    /// Read a hash field.
    async fn hash_get(&self, key: &str, field: &str) -> QueueResult<Option<String>>;

    /// Read every field of a hash.
    async fn hash_get_all(&self, key: &str) -> QueueResult<HashMap<String, String>>;

    /// Delete hash fields; returns how many were present.
    async fn hash_delete(&self, key: &str, fields: &[String]) -> QueueResult<u64>;

    /// Number of fields in a hash.
    async fn hash_len(&self, key: &str) -> QueueResult<u64>;

    /// Push a value onto the head of a list; returns the new length.
    async fn list_push_left(&self, key: &str, value: &str) -> QueueResult<u64>;

    /// Trim a list to the given inclusive range.
    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> QueueResult<()>;

    /// Length of a list.
    async fn list_len(&self, key: &str) -> QueueResult<u64>;

    /// Pop the head of a list, blocking up to `timeout`. `None` means the
    /// wait timed out.
    async fn blocking_pop_left(&self, key: &str, timeout: Duration)
        -> QueueResult<Option<String>>;

    /// Execute a batch of mutations atomically.
    async fn pipeline(&self, ops: &[StoreOp]) -> QueueResult<()>;

    /// Set a key's TTL.
    async fn expire(&self, key: &str, ttl: Duration) -> QueueResult<()>;
}

/// Builds the persistent key names for one queue.
///
/// The patterns are a wire contract shared with other tooling; do not
/// change them.
#[derive(Debug, Clone)]
pub struct QueueKeys {
    name: String,
}

impl QueueKeys {
    /// Key builder for the given queue name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Priority index: sorted set of pending/retrying job ids.
    pub fn index(&self) -> String {
        format!("queue:{}", self.name)
    }

    /// Body hash: job id to serialized job, 24-hour TTL.
    pub fn bodies(&self) -> String {
        format!("jobs:{}", self.name)
    }

    /// Notification list: wake channel for blocked workers.
    pub fn notifications(&self) -> String {
        format!("notifications:{}", self.name)
    }

    /// Dead letter list: serialized bodies of banished jobs.
    pub fn dead_letter(&self) -> String {
        format!("dead_letter:{}", self.name)
    }
}
