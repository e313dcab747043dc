//! In-memory store with the same semantics as the Redis adapter.
//!
//! Backs the test suite: atomic pipelines run under a single lock, and
//! blocking pops park on a per-key `Notify` that pushes wake.

use super::{Store, StoreOp};
use crate::error::QueueResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct Data {
    sorted: HashMap<String, Vec<(String, f64)>>,
    hashes: HashMap<String, HashMap<String, String>>,
    lists: HashMap<String, VecDeque<String>>,
    ttls: HashMap<String, Duration>,
}

/// Shared in-memory store.
#[derive(Default)]
pub(crate) struct MemoryStore {
    data: Mutex<Data>,
    wakers: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// TTL recorded for a key, if any. Expiry itself is not simulated.
    pub(crate) fn recorded_ttl(&self, key: &str) -> Option<Duration> {
        self.data.lock().ttls.get(key).copied()
    }

    fn waker(&self, key: &str) -> Arc<Notify> {
        self.wakers
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    fn apply(data: &mut Data, op: &StoreOp) -> Option<String> {
        match op {
            StoreOp::SortedAdd { key, score, member } => {
                let set = data.sorted.entry(key.clone()).or_default();
                match set.iter_mut().find(|(m, _)| m == member) {
                    Some(entry) => entry.1 = *score,
                    None => set.push((member.clone(), *score)),
                }
                None
            }
            StoreOp::SortedRemove { key, members } => {
                if let Some(set) = data.sorted.get_mut(key) {
                    set.retain(|(m, _)| !members.contains(m));
                }
                None
            }
            StoreOp::HashSet { key, field, value } => {
                data.hashes
                    .entry(key.clone())
                    .or_default()
                    .insert(field.clone(), value.clone());
                None
            }
            StoreOp::HashDelete { key, fields } => {
                if let Some(hash) = data.hashes.get_mut(key) {
                    for field in fields {
                        hash.remove(field);
                    }
                }
                None
            }
            StoreOp::ListPushLeft { key, value } => {
                data.lists
                    .entry(key.clone())
                    .or_default()
                    .push_front(value.clone());
                Some(key.clone())
            }
            StoreOp::ListTrim { key, start, stop } => {
                if let Some(list) = data.lists.get_mut(key) {
                    let len = list.len() as i64;
                    let start = (*start).clamp(0, len);
                    let stop = if *stop < 0 { len + *stop } else { *stop }.min(len - 1);
                    if start > stop {
                        list.clear();
                    } else {
                        *list = list
                            .iter()
                            .skip(start as usize)
                            .take((stop - start + 1) as usize)
                            .cloned()
                            .collect();
                    }
                }
                None
            }
            StoreOp::Expire { key, ttl } => {
                data.ttls.insert(key.clone(), *ttl);
                None
            }
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn sorted_add(&self, key: &str, score: f64, member: &str) -> QueueResult<()> {
        let mut data = self.data.lock();
        Self::apply(
            &mut data,
            &StoreOp::SortedAdd {
                key: key.to_string(),
                score,
                member: member.to_string(),
            },
        );
        Ok(())
    }

    async fn sorted_pop_max(&self, key: &str) -> QueueResult<Option<(String, f64)>> {
        let mut data = self.data.lock();
        let Some(set) = data.sorted.get_mut(key) else {
            return Ok(None);
        };
        let Some(max_idx) = set
            .iter()
            .enumerate()
            .max_by(|(_, (_, a)), (_, (_, b))| a.partial_cmp(b).expect("scores are finite"))
            .map(|(i, _)| i)
        else {
            return Ok(None);
        };
        Ok(Some(set.swap_remove(max_idx)))
    }

    async fn sorted_remove(&self, key: &str, members: &[String]) -> QueueResult<u64> {
        let mut data = self.data.lock();
        let Some(set) = data.sorted.get_mut(key) else {
            return Ok(0);
        };
        let before = set.len();
        set.retain(|(m, _)| !members.contains(m));
        Ok((before - set.len()) as u64)
    }

    async fn sorted_card(&self, key: &str) -> QueueResult<u64> {
        let data = self.data.lock();
        Ok(data.sorted.get(key).map_or(0, |s| s.len() as u64))
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> QueueResult<()> {
        let mut data = self.data.lock();
        data.hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> QueueResult<Option<String>> {
        let data = self.data.lock();
        Ok(data.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn hash_get_all(&self, key: &str) -> QueueResult<HashMap<String, String>> {
        let data = self.data.lock();
        Ok(data.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hash_delete(&self, key: &str, fields: &[String]) -> QueueResult<u64> {
        let mut data = self.data.lock();
        let Some(hash) = data.hashes.get_mut(key) else {
            return Ok(0);
        };
        let mut removed = 0;
        for field in fields {
            if hash.remove(field).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn hash_len(&self, key: &str) -> QueueResult<u64> {
        let data = self.data.lock();
        Ok(data.hashes.get(key).map_or(0, |h| h.len() as u64))
    }

    async fn list_push_left(&self, key: &str, value: &str) -> QueueResult<u64> {
        let len = {
            let mut data = self.data.lock();
            let list = data.lists.entry(key.to_string()).or_default();
            list.push_front(value.to_string());
            list.len() as u64
        };
        self.waker(key).notify_one();
        Ok(len)
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> QueueResult<()> {
        let mut data = self.data.lock();
        Self::apply(
            &mut data,
            &StoreOp::ListTrim {
                key: key.to_string(),
                start,
                stop,
            },
        );
        Ok(())
    }

    async fn list_len(&self, key: &str) -> QueueResult<u64> {
        let data = self.data.lock();
        Ok(data.lists.get(key).map_or(0, |l| l.len() as u64))
    }

    async fn blocking_pop_left(
        &self,
        key: &str,
        timeout: Duration,
    ) -> QueueResult<Option<String>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut data = self.data.lock();
                if let Some(value) = data.lists.get_mut(key).and_then(VecDeque::pop_front) {
                    return Ok(Some(value));
                }
            }
            let notified = {
                let waker = self.waker(key);
                async move { waker.notified().await }
            };
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn pipeline(&self, ops: &[StoreOp]) -> QueueResult<()> {
        let pushed: Vec<String> = {
            let mut data = self.data.lock();
            ops.iter()
                .filter_map(|op| Self::apply(&mut data, op))
                .collect()
        };
        for key in pushed {
            self.waker(&key).notify_one();
        }
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> QueueResult<()> {
        let mut data = self.data.lock();
        data.ttls.insert(key.to_string(), ttl);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sorted_pop_max_order() {
        let store = MemoryStore::new();
        store.sorted_add("z", 1.0, "low").await.unwrap();
        store.sorted_add("z", 3.0, "high").await.unwrap();
        store.sorted_add("z", 2.0, "mid").await.unwrap();

        let (member, score) = store.sorted_pop_max("z").await.unwrap().unwrap();
        assert_eq!(member, "high");
        assert_eq!(score, 3.0);
        let (member, _) = store.sorted_pop_max("z").await.unwrap().unwrap();
        assert_eq!(member, "mid");
        let (member, _) = store.sorted_pop_max("z").await.unwrap().unwrap();
        assert_eq!(member, "low");
        assert!(store.sorted_pop_max("z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sorted_add_rescoring_keeps_one_member() {
        let store = MemoryStore::new();
        store.sorted_add("z", 1.0, "job").await.unwrap();
        store.sorted_add("z", 9.0, "job").await.unwrap();

        assert_eq!(store.sorted_card("z").await.unwrap(), 1);
        let (_, score) = store.sorted_pop_max("z").await.unwrap().unwrap();
        assert_eq!(score, 9.0);
    }

    #[tokio::test]
    async fn test_blocking_pop_times_out() {
        let store = MemoryStore::new();
        let popped = store
            .blocking_pop_left("empty", Duration::from_millis(50))
            .await
            .unwrap();
        assert!(popped.is_none());
    }

    #[tokio::test]
    async fn test_blocking_pop_wakes_on_push() {
        let store = Arc::new(MemoryStore::new());

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .blocking_pop_left("wake", Duration::from_secs(5))
                    .await
                    .unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.list_push_left("wake", "hello").await.unwrap();

        let popped = waiter.await.unwrap();
        assert_eq!(popped.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_list_trim_bounds() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .list_push_left("l", &format!("v{}", i))
                .await
                .unwrap();
        }
        // Head is v4 after five left-pushes.
        store.list_trim("l", 0, 2).await.unwrap();
        assert_eq!(store.list_len("l").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_pipeline_is_atomic_batch() {
        let store = MemoryStore::new();
        store
            .pipeline(&[
                StoreOp::HashSet {
                    key: "h".to_string(),
                    field: "f".to_string(),
                    value: "v".to_string(),
                },
                StoreOp::SortedAdd {
                    key: "z".to_string(),
                    score: 1.0,
                    member: "m".to_string(),
                },
                StoreOp::Expire {
                    key: "h".to_string(),
                    ttl: Duration::from_secs(60),
                },
            ])
            .await
            .unwrap();

        assert_eq!(
            store.hash_get("h", "f").await.unwrap().as_deref(),
            Some("v")
        );
        assert_eq!(store.sorted_card("z").await.unwrap(), 1);
        assert_eq!(store.recorded_ttl("h"), Some(Duration::from_secs(60)));
    }
}
