use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

use crate::binlog::{normalize, Action, EventHandler, Position, RowsEvent};
use crate::checkpoint::CheckpointStore;
use crate::config::DeliveryMode;
use crate::context::RelayContext;
use crate::Result;

/// Glue between the log source and the delivery pipeline.
///
/// Runs on the log-source callback path: it normalizes row events of
/// routed tables, hands each record to the delivery queue (and, depending on
/// [`DeliveryMode`], directly to the sink) and checkpoints position
/// advances. Nothing here fails the callback; transient errors are logged.
pub struct Replicator {
    ctx: Arc<RelayContext>,
    checkpoints: Arc<CheckpointStore>,
}

impl Replicator {
    pub fn new(ctx: Arc<RelayContext>, checkpoints: Arc<CheckpointStore>) -> Self {
        Self { ctx, checkpoints }
    }

    async fn forward(&self, group: &str, table: &str, payload: &str) {
        let enqueued = match self.ctx.queue.push(payload).await {
            Ok(()) => {
                debug!(table = %table, "Queued event");
                true
            }
            Err(e) => {
                warn!(table = %table, error = %e, "Error pushing event to queue");
                false
            }
        };

        let direct = match self.ctx.delivery_mode {
            DeliveryMode::Dual => true,
            DeliveryMode::Queued => !enqueued,
        };
        if direct {
            self.deliver_direct(group, payload).await;
        }
    }

    async fn deliver_direct(&self, group: &str, payload: &str) {
        if let Err(e) = self.ctx.sink.deliver(group, payload).await {
            error!(group = %group, error = %e, "Direct delivery failed");
        }
    }
}

#[async_trait]
impl EventHandler for Replicator {
    async fn on_rows(&self, event: RowsEvent) -> Result<()> {
        let Some(group) = self.ctx.routing.lookup(&event.table) else {
            trace!(table = %event.table, "Skipping ungrouped table");
            return Ok(());
        };

        if event.action == Action::Delete {
            trace!(table = %event.table, "Ignoring delete event");
            return Ok(());
        }

        for record in normalize(&event) {
            let payload = match record.encode() {
                Ok(payload) => payload,
                Err(e) => {
                    error!(table = %event.table, error = %e, "Error encoding change record");
                    continue;
                }
            };
            self.forward(group, &event.table, &payload).await;
        }

        Ok(())
    }

    async fn on_position_synced(&self, position: Position) -> Result<()> {
        trace!(position = %position, "Position synced");
        self.checkpoints.save(&position).await;
        Ok(())
    }
}
