//! Per-workflow actor for CQRS command handling.
//!
//! One actor per workflow wraps the CQRS framework and serializes executor
//! callbacks and human decisions through its mailbox, so a workflow never
//! sees two transitions race. Workflows are fully parallel across actors.

use crate::domain::cqrs::WorkflowAggregate;
use crate::domain::errors::WorkflowError;
use crate::domain::services::WorkflowServices;
use crate::domain::types::WorkflowId;
use crate::domain::view::{WorkflowEventEnvelope, WorkflowView};
use crate::domain::WorkflowCommand;
use crate::domain::WorkflowQuery;
use crate::event_store::{FileEventStore, StoredEvent};
use async_trait::async_trait;
use cqrs_es::{AggregateError, CqrsFramework};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, watch, RwLock};

/// Messages that can be sent to the workflow actor.
pub enum WorkflowMessage {
    /// Execute a command and return the updated view (or error).
    Command(
        Box<WorkflowCommand>,
        oneshot::Sender<Result<WorkflowView, WorkflowError>>,
    ),
    /// Get the current view.
    GetView(oneshot::Sender<WorkflowView>),
}

/// Arguments for spawning a workflow actor.
#[derive(Clone)]
pub struct WorkflowActorArgs {
    /// The aggregate ID (workflow ID as string).
    pub aggregate_id: String,
    /// Path to the event log file.
    pub log_path: PathBuf,
    /// Path to the snapshot file.
    pub snapshot_path: PathBuf,
    /// Snapshot after every N events.
    pub snapshot_every: u64,
    /// Shared view for projection.
    pub view: Arc<RwLock<WorkflowView>>,
    /// Watch channel sender for view snapshots.
    pub snapshot_tx: watch::Sender<WorkflowView>,
    /// Broadcast channel sender for event streaming.
    pub event_tx: broadcast::Sender<WorkflowEventEnvelope>,
    /// Services for command handling.
    pub services: WorkflowServices,
}

/// State maintained by the workflow actor.
pub struct WorkflowActorState {
    /// The CQRS framework instance.
    pub cqrs: CqrsFramework<WorkflowAggregate, FileEventStore>,
    /// The aggregate ID.
    pub aggregate_id: String,
    /// Shared view for reading.
    pub view: Arc<RwLock<WorkflowView>>,
}

/// The workflow actor.
pub struct WorkflowActor;

impl WorkflowActor {
    /// Builds the CQRS framework from actor arguments.
    pub fn build_cqrs(
        args: &WorkflowActorArgs,
    ) -> CqrsFramework<WorkflowAggregate, FileEventStore> {
        let store = FileEventStore::new(
            args.log_path.clone(),
            args.snapshot_path.clone(),
            args.snapshot_every,
        );

        let query = WorkflowQuery::new(
            args.view.clone(),
            args.snapshot_tx.clone(),
            args.event_tx.clone(),
        );

        CqrsFramework::new(store, vec![Box::new(query)], args.services.clone())
    }
}

#[async_trait]
impl Actor for WorkflowActor {
    type Msg = WorkflowMessage;
    type State = WorkflowActorState;
    type Arguments = WorkflowActorArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let cqrs = WorkflowActor::build_cqrs(&args);

        Ok(WorkflowActorState {
            cqrs,
            aggregate_id: args.aggregate_id,
            view: args.view,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkflowMessage::Command(boxed_cmd, reply) => {
                let cmd = *boxed_cmd;
                let result = state.cqrs.execute(&state.aggregate_id, cmd).await;
                let view = state.view.read().await.clone();

                let mapped = match result {
                    Ok(()) => Ok(view),
                    Err(AggregateError::UserError(err)) => Err(err),
                    Err(AggregateError::AggregateConflict) => {
                        Err(WorkflowError::ConcurrencyConflict {
                            message: "workflow was modified concurrently".to_string(),
                        })
                    }
                    Err(err) => Err(WorkflowError::StorageFailure {
                        message: err.to_string(),
                    }),
                };

                if reply.send(mapped).is_err() {
                    tracing::debug!("Command reply channel closed");
                }
            }
            WorkflowMessage::GetView(reply) => {
                let view = state.view.read().await.clone();
                if reply.send(view).is_err() {
                    tracing::debug!("View reply channel closed");
                }
            }
        }

        Ok(())
    }
}

/// Bootstraps a WorkflowView by replaying events from an event log file.
///
/// Used when resuming workflows after a restart. Returns
/// `WorkflowView::default()` if the log file doesn't exist.
pub fn bootstrap_view_from_events(log_path: &Path, aggregate_id: &str) -> WorkflowView {
    let mut view = WorkflowView::default();

    let file = match File::open(log_path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return view,
        Err(_) => return view, // Return default on any error
    };

    let reader = BufReader::new(file);
    let mut skipped_lines = 0;

    for line in reader.lines().map_while(Result::ok) {
        if let Ok(stored) = serde_json::from_str::<StoredEvent>(&line) {
            if stored.aggregate_id == aggregate_id {
                view.apply_event(&stored.aggregate_id, &stored.event, stored.sequence);
            }
        } else {
            skipped_lines += 1;
        }
    }

    if skipped_lines > 0 {
        tracing::warn!("Skipped {} unparseable lines in event log", skipped_lines);
    }

    view
}

/// Builds actor arguments for a workflow under the pipeline data directory,
/// bootstrapping the view from any persisted events.
///
/// Layout: `<data_dir>/<workflow_id>/events.jsonl` plus `snapshot.json`.
pub fn create_actor_args(
    data_dir: &Path,
    workflow_id: &WorkflowId,
    snapshot_every: u64,
) -> (
    WorkflowActorArgs,
    watch::Receiver<WorkflowView>,
    broadcast::Receiver<WorkflowEventEnvelope>,
) {
    let aggregate_id = workflow_id.to_string();
    let workflow_dir = data_dir.join(&aggregate_id);
    let log_path = workflow_dir.join("events.jsonl");
    let snapshot_path = workflow_dir.join("snapshot.json");

    // Bootstrap the view from existing events (if any)
    let initial_view = bootstrap_view_from_events(&log_path, &aggregate_id);
    let view = Arc::new(RwLock::new(initial_view.clone()));
    let (snapshot_tx, snapshot_rx) = watch::channel(initial_view);
    let (event_tx, event_rx) = broadcast::channel(64);

    let args = WorkflowActorArgs {
        aggregate_id,
        log_path,
        snapshot_path,
        snapshot_every,
        view,
        snapshot_tx,
        event_tx,
        services: WorkflowServices::default(),
    };

    (args, snapshot_rx, event_rx)
}

#[cfg(test)]
#[path = "tests/actor_tests.rs"]
mod tests;
