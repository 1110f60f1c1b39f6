//! Process-wide state, built once at startup and shared read-only.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::RedisBackend;
use crate::config::{Config, DeliveryMode};
use crate::delivery::{DeliveryQueue, HttpSink, RedisQueue, Sink};
use crate::routing::RoutingTable;
use crate::Result;

pub struct RelayContext {
    pub routing: RoutingTable,
    pub sink: Arc<dyn Sink>,
    /// Queue the orchestrator pushes into.
    pub queue: Arc<dyn DeliveryQueue>,
    /// Queue the worker pops from. Same backing list as `queue`, possibly a
    /// separate connection so a blocking pop never stalls a push.
    pub consumer_queue: Arc<dyn DeliveryQueue>,
    pub delivery_mode: DeliveryMode,
    pub retry_interval: Duration,
    pub pop_timeout: Duration,
}

impl RelayContext {
    pub fn new(
        routing: RoutingTable,
        sink: Arc<dyn Sink>,
        queue: Arc<dyn DeliveryQueue>,
    ) -> Self {
        Self {
            routing,
            sink,
            consumer_queue: queue.clone(),
            queue,
            delivery_mode: DeliveryMode::default(),
            retry_interval: Duration::from_secs(5),
            pop_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_consumer_queue(mut self, queue: Arc<dyn DeliveryQueue>) -> Self {
        self.consumer_queue = queue;
        self
    }

    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = mode;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_pop_timeout(mut self, timeout: Duration) -> Self {
        self.pop_timeout = timeout;
        self
    }

    /// Wires the Redis queue and HTTP sink described by `config`.
    pub fn from_config(
        config: &Config,
        routing: RoutingTable,
        backend: &RedisBackend,
    ) -> Result<Self> {
        let sink = HttpSink::new(&config.delivery.base_url, config.delivery.timeout())?;
        let producer = RedisQueue::new(backend.clone(), &config.redis.queue_key);
        let consumer = RedisQueue::new(backend.dedicated(), &config.redis.queue_key);

        Ok(Self::new(routing, Arc::new(sink), Arc::new(producer))
            .with_consumer_queue(Arc::new(consumer))
            .with_delivery_mode(config.delivery.mode)
            .with_retry_interval(config.redis.retry_interval())
            .with_pop_timeout(config.redis.pop_timeout()))
    }
}
