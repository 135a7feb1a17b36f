//! Tests for the JSONL file event store.

use super::*;
use crate::domain::step::StepInput;
use crate::domain::types::{ContentType, StepNumber, WorkflowStatus};
use crate::domain::{WorkflowEvent, WorkflowState};
use crate::template::StepTemplate;
use crate::domain::types::AgentRole;
use tempfile::TempDir;

fn store_in(dir: &TempDir, snapshot_every: u64) -> FileEventStore {
    FileEventStore::new(
        dir.path().join("events.jsonl"),
        dir.path().join("snapshot.json"),
        snapshot_every,
    )
}

fn creation_events() -> Vec<WorkflowEvent> {
    vec![
        WorkflowEvent::WorkflowCreated {
            content_type: ContentType::XThread,
            template: vec![
                StepTemplate::agent("Thread Writing", AgentRole::BlogWriter),
                StepTemplate::gate("Thread Review"),
            ],
            selected_angle: "rustls adoption".into(),
            source_research_id: "research-3".into(),
            briefing: None,
            author_id: None,
            created_at: TimestampUtc::now(),
        },
        WorkflowEvent::StepDispatched {
            step_number: StepNumber::first(),
            input: StepInput::new("rustls adoption".into(), None, None),
            dispatched_at: TimestampUtc::now(),
        },
    ]
}

#[tokio::test]
async fn commit_then_reload_round_trips_state() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 0);
    let id = WorkflowId::new().to_string();

    let context = store.load_aggregate(&id).await.unwrap();
    assert_eq!(context.current_sequence, 0);

    let envelopes = store
        .commit(creation_events(), context, HashMap::new())
        .await
        .unwrap();
    assert_eq!(envelopes.len(), 2);
    assert_eq!(envelopes[0].sequence, 1);
    assert_eq!(envelopes[1].sequence, 2);

    let reloaded = store.load_aggregate(&id).await.unwrap();
    assert_eq!(reloaded.current_sequence, 2);
    match &reloaded.aggregate.state {
        WorkflowState::Active(data) => {
            assert_eq!(data.status(), WorkflowStatus::Active);
            assert_eq!(data.steps().len(), 2);
        }
        _ => panic!("Expected Active state after replay"),
    }
}

#[tokio::test]
async fn load_events_on_missing_log_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 0);

    let events = store.load_events("anything").await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn events_for_other_aggregates_are_skipped() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 0);
    let id_a = WorkflowId::new().to_string();
    let id_b = WorkflowId::new().to_string();

    let context = store.load_aggregate(&id_a).await.unwrap();
    store
        .commit(creation_events(), context, HashMap::new())
        .await
        .unwrap();

    assert_eq!(store.load_events(&id_a).await.unwrap().len(), 2);
    assert!(store.load_events(&id_b).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_commit_from_stale_context_conflicts() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 0);
    let id = WorkflowId::new().to_string();

    let first = store.load_aggregate(&id).await.unwrap();
    let stale = store.load_aggregate(&id).await.unwrap();

    store
        .commit(creation_events(), first, HashMap::new())
        .await
        .unwrap();

    let result = store.commit(creation_events(), stale, HashMap::new()).await;
    assert!(matches!(result, Err(AggregateError::AggregateConflict)));
}

#[tokio::test]
async fn snapshot_written_at_threshold_and_used_on_load() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 2);
    let id = WorkflowId::new().to_string();

    let context = store.load_aggregate(&id).await.unwrap();
    store
        .commit(creation_events(), context, HashMap::new())
        .await
        .unwrap();

    assert!(store.snapshot_path.is_file());
    let snapshot: StoredSnapshot =
        serde_json::from_str(&std::fs::read_to_string(&store.snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot.aggregate_id, id);
    assert_eq!(snapshot.sequence, 2);

    let reloaded = store.load_aggregate(&id).await.unwrap();
    assert_eq!(reloaded.current_sequence, 2);
}

#[tokio::test]
async fn empty_commit_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 0);
    let id = WorkflowId::new().to_string();

    let context = store.load_aggregate(&id).await.unwrap();
    let envelopes = store.commit(Vec::new(), context, HashMap::new()).await.unwrap();

    assert!(envelopes.is_empty());
    assert!(!store.log_path.exists());
}

#[tokio::test]
async fn corrupt_log_line_fails_deserialization() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir, 0);
    std::fs::write(&store.log_path, "not json\n").unwrap();

    let result = store.load_events("any").await;
    assert!(matches!(
        result,
        Err(AggregateError::DeserializationError(_))
    ));
}

#[test]
fn snapshot_threshold_rules() {
    assert!(!should_snapshot(10, 0));
    assert!(should_snapshot(10, 5));
    assert!(!should_snapshot(11, 5));
    assert!(should_snapshot(5, 5));
}
