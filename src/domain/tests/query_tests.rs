//! Tests for the projection fan-out.

use super::*;
use crate::domain::step::StepInput;
use crate::domain::types::{AgentRole, ContentType, StepNumber, TimestampUtc, WorkflowStatus};
use crate::domain::WorkflowEvent;
use crate::template::StepTemplate;
use std::collections::HashMap;
use uuid::Uuid;

fn creation_batch(aggregate_id: &str) -> Vec<cqrs_es::EventEnvelope<WorkflowAggregate>> {
    let events = vec![
        WorkflowEvent::WorkflowCreated {
            content_type: ContentType::LinkedinPost,
            template: vec![
                StepTemplate::agent("Post Writing", AgentRole::BlogWriter),
                StepTemplate::gate("Post Review"),
            ],
            selected_angle: "angle".into(),
            source_research_id: "research-9".into(),
            briefing: None,
            author_id: None,
            created_at: TimestampUtc::now(),
        },
        WorkflowEvent::StepDispatched {
            step_number: StepNumber(1),
            input: StepInput::new("angle".into(), None, None),
            dispatched_at: TimestampUtc::now(),
        },
    ];
    events
        .into_iter()
        .enumerate()
        .map(|(idx, payload)| cqrs_es::EventEnvelope {
            aggregate_id: aggregate_id.to_string(),
            sequence: idx + 1,
            payload,
            metadata: HashMap::new(),
        })
        .collect()
}

#[tokio::test]
async fn dispatch_folds_events_into_the_shared_projection() {
    let projection = Arc::new(RwLock::new(WorkflowView::default()));
    let (snapshot_tx, _snapshot_rx) = watch::channel(WorkflowView::default());
    let (event_tx, _event_rx) = broadcast::channel(16);

    let query = WorkflowQuery::new(projection.clone(), snapshot_tx, event_tx);
    let aggregate_id = Uuid::new_v4().to_string();

    query
        .dispatch(&aggregate_id, &creation_batch(&aggregate_id))
        .await;

    let view = projection.read().await;
    assert_eq!(view.status(), WorkflowStatus::Active);
    assert_eq!(view.steps().len(), 2);
    assert_eq!(view.current_step_number(), Some(StepNumber(1)));
    assert_eq!(view.last_event_sequence(), 2);
}

#[tokio::test]
async fn events_stream_in_commit_order_with_one_snapshot_per_batch() {
    let projection = Arc::new(RwLock::new(WorkflowView::default()));
    let (snapshot_tx, mut snapshot_rx) = watch::channel(WorkflowView::default());
    let (event_tx, mut event_rx) = broadcast::channel(16);

    let query = WorkflowQuery::new(projection, snapshot_tx, event_tx);
    let aggregate_id = Uuid::new_v4().to_string();

    query
        .dispatch(&aggregate_id, &creation_batch(&aggregate_id))
        .await;

    let first = event_rx.try_recv().unwrap();
    assert_eq!(first.aggregate_id, aggregate_id);
    assert_eq!(first.sequence, 1);
    assert!(matches!(first.event, WorkflowEvent::WorkflowCreated { .. }));
    let second = event_rx.try_recv().unwrap();
    assert_eq!(second.sequence, 2);
    assert!(matches!(second.event, WorkflowEvent::StepDispatched { .. }));

    // Both events landed under a single snapshot update, reflecting the
    // whole batch.
    snapshot_rx.changed().await.unwrap();
    let snapshot = snapshot_rx.borrow_and_update();
    assert_eq!(snapshot.current_step_number(), Some(StepNumber(1)));
    drop(snapshot);
    assert!(!snapshot_rx.has_changed().unwrap());
}

#[tokio::test]
async fn broadcast_without_receivers_is_not_an_error() {
    let projection = Arc::new(RwLock::new(WorkflowView::default()));
    let (snapshot_tx, _snapshot_rx) = watch::channel(WorkflowView::default());
    let (event_tx, event_rx) = broadcast::channel(16);
    drop(event_rx);

    let query = WorkflowQuery::new(projection.clone(), snapshot_tx, event_tx);
    let aggregate_id = Uuid::new_v4().to_string();

    query
        .dispatch(&aggregate_id, &creation_batch(&aggregate_id))
        .await;

    // The projection still advanced.
    assert_eq!(
        projection.read().await.status(),
        WorkflowStatus::Active
    );
}
