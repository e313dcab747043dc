//! Redis-backed store adapter.

use super::{Store, StoreOp};
use crate::error::{QueueError, QueueResult};
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

/// Create a Redis connection pool and verify connectivity.
pub async fn create_pool(url: &str, pool_size: usize) -> QueueResult<Pool> {
    let cfg = Config::from_url(url);

    let pool = cfg
        .builder()
        .map_err(|e| QueueError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| QueueError::Configuration(format!("Failed to create pool: {}", e)))?;

    let mut conn = pool.get().await?;
    redis::cmd("PING").query_async::<String>(&mut *conn).await?;

    info!(pool_size, "Redis connection pool created");

    Ok(pool)
}

/// Store adapter over a pooled Redis connection.
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Wraps an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> QueueResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn sorted_add(&self, key: &str, score: f64, member: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn sorted_pop_max(&self, key: &str) -> QueueResult<Option<(String, f64)>> {
        let mut conn = self.conn().await?;
        let popped: Vec<(String, f64)> = conn.zpopmax(key, 1).await?;
        Ok(popped.into_iter().next())
    }

    async fn sorted_remove(&self, key: &str, members: &[String]) -> QueueResult<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        let removed: u64 = conn.zrem(key, members.to_vec()).await?;
        Ok(removed)
    }

    async fn sorted_card(&self, key: &str) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        let count: u64 = conn.zcard(key).await?;
        Ok(count)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> QueueResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hash_get_all(&self, key: &str) -> QueueResult<HashMap<String, String>> {
        let mut conn = self.conn().await?;
        let entries: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(entries)
    }

    async fn hash_delete(&self, key: &str, fields: &[String]) -> QueueResult<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        let removed: u64 = conn.hdel(key, fields.to_vec()).await?;
        Ok(removed)
    }

    async fn hash_len(&self, key: &str) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        let count: u64 = conn.hlen(key).await?;
        Ok(count)
    }

    async fn list_push_left(&self, key: &str, value: &str) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        let len: u64 = conn.lpush(key, value).await?;
        Ok(len)
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.ltrim(key, start as isize, stop as isize).await?;
        Ok(())
    }

    async fn list_len(&self, key: &str) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        let len: u64 = conn.llen(key).await?;
        Ok(len)
    }

    async fn blocking_pop_left(
        &self,
        key: &str,
        timeout: Duration,
    ) -> QueueResult<Option<String>> {
        let mut conn = self.conn().await?;
        // BLPOP returns (key, value), or nil on timeout.
        let popped: Option<(String, String)> = conn.blpop(key, timeout.as_secs_f64()).await?;
        Ok(popped.map(|(_, value)| value))
    }

    async fn pipeline(&self, ops: &[StoreOp]) -> QueueResult<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in ops {
            match op {
                StoreOp::SortedAdd { key, score, member } => {
                    pipe.zadd(key, member, *score);
                }
                StoreOp::SortedRemove { key, members } => {
                    if !members.is_empty() {
                        pipe.zrem(key, members.clone());
                    }
                }
                StoreOp::HashSet { key, field, value } => {
                    pipe.hset(key, field, value);
                }
                StoreOp::HashDelete { key, fields } => {
                    if !fields.is_empty() {
                        pipe.hdel(key, fields.clone());
                    }
                }
                StoreOp::ListPushLeft { key, value } => {
                    pipe.lpush(key, value);
                }
                StoreOp::ListTrim { key, start, stop } => {
                    pipe.ltrim(key, *start as isize, *stop as isize);
                }
                StoreOp::Expire { key, ttl } => {
                    pipe.expire(key, ttl.as_secs() as i64);
                }
            }
        }

        let _: () = pipe.query_async(&mut *conn).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let _: bool = conn.expire(key, ttl.as_secs() as i64).await?;
        Ok(())
    }
}
