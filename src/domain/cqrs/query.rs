//! Projection fan-out for committed workflow events.
//!
//! Every committed batch is folded into the shared `WorkflowView`, then
//! pushed out twice: the full envelope on a broadcast channel (the dispatch
//! loop keys off `StepDispatched` there) and the refreshed view on a watch
//! channel for observers that only care about the latest state.

use super::WorkflowAggregate;
use crate::domain::view::{WorkflowEventEnvelope, WorkflowView};
use async_trait::async_trait;
use cqrs_es::Query;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};

pub struct WorkflowQuery {
    /// Shared projection, also read synchronously by the actor.
    pub projection: Arc<RwLock<WorkflowView>>,
    /// Latest-view channel; one update per committed batch.
    pub snapshot_tx: watch::Sender<WorkflowView>,
    /// Per-event stream, in commit order.
    pub event_tx: broadcast::Sender<WorkflowEventEnvelope>,
}

impl WorkflowQuery {
    pub fn new(
        projection: Arc<RwLock<WorkflowView>>,
        snapshot_tx: watch::Sender<WorkflowView>,
        event_tx: broadcast::Sender<WorkflowEventEnvelope>,
    ) -> Self {
        Self {
            projection,
            snapshot_tx,
            event_tx,
        }
    }
}

#[async_trait]
impl Query<WorkflowAggregate> for WorkflowQuery {
    async fn dispatch(
        &self,
        aggregate_id: &str,
        events: &[cqrs_es::EventEnvelope<WorkflowAggregate>],
    ) {
        let mut view = self.projection.write().await;

        for event in events {
            view.apply_event(aggregate_id, &event.payload, event.sequence as u64);

            // Send only fails with no receivers, which is fine before
            // anyone subscribes.
            let _ = self.event_tx.send(WorkflowEventEnvelope::from(event));
        }

        // The snapshot goes out once per batch, so watchers never observe a
        // half-applied multi-event commit.
        let _ = self.snapshot_tx.send(view.clone());
    }
}

#[cfg(test)]
#[path = "../tests/query_tests.rs"]
mod tests;
