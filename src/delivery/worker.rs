use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::binlog::ChangeRecord;
use crate::context::RelayContext;

/// Outcome of one worker iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStep {
    /// Nothing arrived within the pop timeout.
    Idle,
    /// The queue could not be reached; the worker waited before returning.
    Backoff,
    Delivered { group: String },
    /// The record belongs to a table with no routing group.
    Unrouted { table: String },
    /// The item could not be decoded and was dropped.
    Invalid,
    /// Delivery failed; the item is not requeued.
    Failed { group: String },
}

/// Drains the delivery queue and forwards each item to its routing group.
///
/// Items are removed from the queue before delivery is attempted, so a
/// failed delivery is logged and the item is lost.
pub struct DeliveryWorker {
    ctx: Arc<RelayContext>,
}

impl DeliveryWorker {
    pub fn new(ctx: Arc<RelayContext>) -> Self {
        Self { ctx }
    }

    /// Runs for the lifetime of the process.
    pub async fn run(self) {
        info!("Starting queue worker");
        loop {
            self.step().await;
        }
    }

    pub async fn step(&self) -> WorkerStep {
        match self.ctx.consumer_queue.pop(self.ctx.pop_timeout).await {
            Ok(Some(item)) => self.dispatch(&item).await,
            Ok(None) => WorkerStep::Idle,
            Err(e) => {
                warn!(
                    error = %e,
                    retry_in = ?self.ctx.retry_interval,
                    "Queue unavailable, retrying"
                );
                tokio::time::sleep(self.ctx.retry_interval).await;
                WorkerStep::Backoff
            }
        }
    }

    async fn dispatch(&self, item: &str) -> WorkerStep {
        let record = match ChangeRecord::decode(item) {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Error decoding queued event");
                return WorkerStep::Invalid;
            }
        };

        let table = record.table();
        let Some(group) = self.ctx.routing.lookup(table) else {
            debug!(table = %table, "Skipping ungrouped table from queue");
            return WorkerStep::Unrouted {
                table: table.to_string(),
            };
        };

        match self.ctx.sink.deliver(group, item).await {
            Ok(()) => WorkerStep::Delivered {
                group: group.to_string(),
            },
            Err(e) => {
                warn!(group = %group, error = %e, "Delivery of queued event failed");
                WorkerStep::Failed {
                    group: group.to_string(),
                }
            }
        }
    }
}
