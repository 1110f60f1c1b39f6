use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::trace;

use crate::backend::RedisBackend;
use crate::Result;

/// FIFO of encoded change records. Items are opaque strings to the queue.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    /// Appends an item to the tail.
    async fn push(&self, item: &str) -> Result<()>;

    /// Removes and returns the head, waiting up to `timeout` for one to
    /// arrive. The item is gone from the queue once returned.
    async fn pop(&self, timeout: Duration) -> Result<Option<String>>;
}

/// Redis list: `RPUSH` at the tail, `BLPOP` from the head.
pub struct RedisQueue {
    backend: RedisBackend,
    key: String,
}

impl RedisQueue {
    pub fn new(backend: RedisBackend, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl DeliveryQueue for RedisQueue {
    async fn push(&self, item: &str) -> Result<()> {
        let mut conn = self.backend.connection().await?;
        let len: u64 = redis::cmd("RPUSH")
            .arg(&self.key)
            .arg(item)
            .query_async(&mut conn)
            .await?;
        trace!(key = %self.key, len, "Queued item");
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<String>> {
        let mut conn = self.backend.connection().await?;
        // BLPOP takes whole seconds here; 0 would block forever.
        let popped: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(&self.key)
            .arg(timeout.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(popped.map(|(_, item)| item))
    }
}

/// In-process FIFO. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<String>>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[async_trait]
impl DeliveryQueue for MemoryQueue {
    async fn push(&self, item: &str) -> Result<()> {
        self.items.lock().await.push_back(item.to_string());
        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<String>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(item) = self.items.lock().await.pop_front() {
                return Ok(Some(item));
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(self.items.lock().await.pop_front());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_queue_is_fifo() {
        let queue = MemoryQueue::new();
        queue.push("first").await.unwrap();
        queue.push("second").await.unwrap();

        let timeout = Duration::from_millis(10);
        assert_eq!(queue.pop(timeout).await.unwrap().as_deref(), Some("first"));
        assert_eq!(queue.pop(timeout).await.unwrap().as_deref(), Some("second"));
        assert_eq!(queue.pop(timeout).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_queue_wakes_waiting_consumer() {
        let queue = std::sync::Arc::new(MemoryQueue::new());

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push("late").await.unwrap();

        let popped = consumer.await.unwrap().unwrap();
        assert_eq!(popped.as_deref(), Some("late"));
        assert!(queue.is_empty().await);
    }
}
