#![allow(dead_code)]

use async_trait::async_trait;
use binlog_relay::config::{Config, DeliveryMode};
use binlog_relay::delivery::Sink;
use binlog_relay::routing::RoutingTable;
use binlog_relay::Result;
use std::env;
use std::sync::Mutex;

/// Get test configuration from environment variables
pub fn get_test_config() -> Config {
    let mut config = Config::default();
    config.redis.url =
        env::var("TEST_REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    config.redis.queue_key = format!("test_cdc_events_{}", std::process::id());
    config.redis.retry_interval_secs = 1;
    config.redis.pop_timeout_secs = 1;
    config.checkpoint.redis_key = format!("test_binlog_position_{}", std::process::id());
    config.delivery.mode = DeliveryMode::Queued;
    config
}

pub fn shop_routing() -> RoutingTable {
    RoutingTable::from_groups(vec![
        (
            "shop".to_string(),
            vec!["orders".to_string(), "order_items".to_string()],
        ),
        ("crm".to_string(), vec!["customers".to_string()]),
    ])
    .unwrap()
}

/// Sink that records every delivery instead of sending it.
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn groups(&self) -> Vec<String> {
        self.deliveries()
            .into_iter()
            .map(|(group, _)| group)
            .collect()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn deliver(&self, group: &str, payload: &str) -> Result<()> {
        self.deliveries
            .lock()
            .unwrap()
            .push((group.to_string(), payload.to_string()));
        Ok(())
    }
}
