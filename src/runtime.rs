//! Pipeline runtime: spawns workflow actors under supervision and runs the
//! dispatch loop that connects persisted `StepDispatched` events to the
//! pluggable step executor.
//!
//! The loop subscribes to a workflow's event broadcast before the first
//! command is sent, so the initial dispatch is never missed. Executor
//! results come back as commands through the same actor mailbox as review
//! decisions, which is what makes stale callbacks harmless.

use std::path::Path;
use std::sync::{Arc, Mutex};

use ractor::{Actor, ActorRef};
use tokio::sync::{broadcast, oneshot, watch};

use crate::config::PipelineConfig;
use crate::domain::actor::create_actor_args;
use crate::domain::supervisor::{SupervisorMsg, WorkflowSupervisor};
use crate::domain::types::{
    AuthorId, ContentType, ResearchId, SelectedAngle, StepNumber, StepStatus, TimestampUtc,
    WorkflowId,
};
use crate::domain::view::{WorkflowEventEnvelope, WorkflowView};
use crate::domain::{
    StepInput, WorkflowCommand, WorkflowError, WorkflowEvent, WorkflowMessage,
};
use crate::executor::{DispatchRequest, ExecutorReply, ProgressSink, StepExecutor};
use crate::gate::ReviewGate;
use crate::telemetry::{HumanTimeTable, WorkflowStats};
use crate::template::TemplateRegistry;

/// Everything needed to start a new workflow.
#[derive(Debug, Clone)]
pub struct CreateWorkflowRequest {
    pub content_type: ContentType,
    pub selected_angle: SelectedAngle,
    pub source_research_id: ResearchId,
    pub briefing: Option<String>,
    pub author_id: Option<AuthorId>,
}

/// Owns the template registry and the executor, and spawns one supervised
/// actor per workflow.
pub struct PipelineRuntime {
    config: PipelineConfig,
    registry: TemplateRegistry,
    executor: Arc<dyn StepExecutor>,
    supervisors: Mutex<Vec<ActorRef<SupervisorMsg>>>,
}

impl PipelineRuntime {
    pub fn new(
        config: PipelineConfig,
        registry: TemplateRegistry,
        executor: Arc<dyn StepExecutor>,
    ) -> Self {
        Self {
            config,
            registry,
            executor,
            supervisors: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Creates a new workflow from the registered template for the content
    /// type and dispatches its first step.
    pub async fn create_workflow(
        &self,
        request: CreateWorkflowRequest,
    ) -> anyhow::Result<WorkflowHandle> {
        let template = self.registry.resolve(request.content_type)?.steps.clone();
        let workflow_id = WorkflowId::new();

        tracing::info!(
            workflow_id = %workflow_id,
            content_type = request.content_type.label(),
            steps = template.len(),
            "Creating workflow"
        );

        let handle = self.spawn_workflow(workflow_id).await?;
        handle
            .execute(WorkflowCommand::CreateWorkflow {
                content_type: request.content_type,
                template,
                selected_angle: request.selected_angle,
                source_research_id: request.source_research_id,
                briefing: request.briefing,
                author_id: request.author_id,
            })
            .await?;

        Ok(handle)
    }

    /// Resumes a persisted workflow after a restart. If a step was mid-run
    /// when the process died, its executor is re-invoked with the same
    /// input; the old run's callbacks (if any ever arrive) are discarded as
    /// stale.
    pub async fn resume_workflow(&self, workflow_id: WorkflowId) -> anyhow::Result<WorkflowHandle> {
        let handle = self.spawn_workflow(workflow_id).await?;
        let view = handle.view().await?;

        if let Some(step) = view.active_step() {
            if step.status == StepStatus::AgentWorking {
                if let Some(input) = step.input.clone() {
                    tracing::info!(
                        workflow_id = %handle.id(),
                        step = %step.step_number,
                        "Re-dispatching in-flight step after resume"
                    );
                    run_step(
                        self.executor.clone(),
                        handle.clone(),
                        step.step_number,
                        input,
                    );
                }
            }
        }

        Ok(handle)
    }

    /// Workflow IDs with persisted event logs under the data directory.
    pub fn persisted_workflows(&self) -> anyhow::Result<Vec<WorkflowId>> {
        persisted_workflow_ids(&self.config.data_dir)
    }

    /// Stops every workflow actor spawned through this runtime. Event logs
    /// stay on disk; workflows can be picked up again with
    /// [`resume_workflow`](Self::resume_workflow).
    pub fn shutdown(&self) {
        let supervisors = {
            let mut guard = self
                .supervisors
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        };
        for supervisor in supervisors {
            let _ = supervisor.send_message(SupervisorMsg::Stop);
        }
    }

    async fn spawn_workflow(&self, workflow_id: WorkflowId) -> anyhow::Result<WorkflowHandle> {
        let (args, snapshot_rx, event_rx) =
            create_actor_args(&self.config.data_dir, &workflow_id, self.config.snapshot_every);
        let event_tx = args.event_tx.clone();

        let (supervisor, _join) = Actor::spawn(None, WorkflowSupervisor, ())
            .await
            .map_err(|e| anyhow::anyhow!("spawning workflow supervisor: {:?}", e))?;

        let (tx, rx) = oneshot::channel();
        supervisor
            .send_message(SupervisorMsg::Spawn(args, tx))
            .map_err(|_| anyhow::anyhow!("workflow supervisor unavailable"))?;
        let actor = rx
            .await
            .map_err(|_| anyhow::anyhow!("workflow actor failed to start"))?;

        self.supervisors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(supervisor.clone());

        let handle = WorkflowHandle {
            workflow_id,
            actor,
            supervisor,
            snapshot_rx,
            event_tx,
            time_table: self.config.time_table.clone(),
        };

        spawn_dispatch_loop(self.executor.clone(), handle.clone(), event_rx);

        Ok(handle)
    }
}

/// Client-side handle to one running workflow actor.
#[derive(Clone)]
pub struct WorkflowHandle {
    workflow_id: WorkflowId,
    actor: ActorRef<WorkflowMessage>,
    supervisor: ActorRef<SupervisorMsg>,
    snapshot_rx: watch::Receiver<WorkflowView>,
    event_tx: broadcast::Sender<WorkflowEventEnvelope>,
    time_table: HumanTimeTable,
}

impl WorkflowHandle {
    pub fn id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    /// Sends a command to the workflow actor and waits for the updated view.
    pub async fn execute(&self, command: WorkflowCommand) -> Result<WorkflowView, WorkflowError> {
        let (tx, rx) = oneshot::channel();
        self.actor
            .send_message(WorkflowMessage::Command(Box::new(command), tx))
            .map_err(|_| WorkflowError::StorageFailure {
                message: "workflow actor unavailable".to_string(),
            })?;
        rx.await.map_err(|_| WorkflowError::StorageFailure {
            message: "workflow actor dropped the command".to_string(),
        })?
    }

    /// Current projected view.
    pub async fn view(&self) -> Result<WorkflowView, WorkflowError> {
        let (tx, rx) = oneshot::channel();
        self.actor
            .send_message(WorkflowMessage::GetView(tx))
            .map_err(|_| WorkflowError::StorageFailure {
                message: "workflow actor unavailable".to_string(),
            })?;
        rx.await.map_err(|_| WorkflowError::StorageFailure {
            message: "workflow actor dropped the request".to_string(),
        })
    }

    /// Watch channel carrying a fresh view snapshot after every committed
    /// command.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowView> {
        self.snapshot_rx.clone()
    }

    /// Live stream of committed event envelopes.
    pub fn events(&self) -> broadcast::Receiver<WorkflowEventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Review surface for this workflow.
    pub fn review_gate(&self) -> ReviewGate {
        ReviewGate::new(self.clone())
    }

    /// Re-runs a failed step.
    pub async fn retry_step(&self, step_number: StepNumber) -> Result<WorkflowView, WorkflowError> {
        self.execute(WorkflowCommand::RetryStep { step_number }).await
    }

    /// Cancels the workflow; open steps are skipped.
    pub async fn cancel(&self, reason: impl Into<String>) -> Result<WorkflowView, WorkflowError> {
        self.execute(WorkflowCommand::CancelWorkflow {
            reason: reason.into(),
        })
        .await
    }

    /// Stops the workflow actor and its supervisor. The persisted event log
    /// is untouched, so the workflow can be resumed later. Commands sent
    /// through this handle afterwards fail.
    pub fn stop(&self) {
        let _ = self.supervisor.send_message(SupervisorMsg::Stop);
    }

    /// Activity log and time-saved figures for the current view.
    pub async fn stats(&self) -> Result<WorkflowStats, WorkflowError> {
        let view = self.view().await?;
        Ok(WorkflowStats::collect(
            &view,
            &self.time_table,
            TimestampUtc::now(),
        ))
    }
}

/// Reacts to committed `StepDispatched` events by running the executor for
/// the dispatched step. Ends when the workflow completes or is cancelled,
/// or when the event channel closes. A failed workflow keeps its loop; a
/// later retry re-dispatches through it.
fn spawn_dispatch_loop(
    executor: Arc<dyn StepExecutor>,
    handle: WorkflowHandle,
    mut event_rx: broadcast::Receiver<WorkflowEventEnvelope>,
) {
    tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(envelope) => match envelope.event {
                    WorkflowEvent::StepDispatched {
                        step_number, input, ..
                    } => {
                        run_step(executor.clone(), handle.clone(), step_number, input);
                    }
                    WorkflowEvent::WorkflowCompleted { .. }
                    | WorkflowEvent::WorkflowCancelled { .. } => {
                        tracing::debug!(
                            workflow_id = %handle.id(),
                            "Workflow reached a terminal state, dispatch loop ending"
                        );
                        break;
                    }
                    _ => {}
                },
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(
                        workflow_id = %handle.id(),
                        missed,
                        "Dispatch loop lagged behind event stream"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Runs the executor for one dispatched step in its own task, pumping
/// progress updates back as commands and delivering the final result.
fn run_step(
    executor: Arc<dyn StepExecutor>,
    handle: WorkflowHandle,
    step_number: StepNumber,
    input: StepInput,
) {
    tokio::spawn(async move {
        let view = match handle.view().await {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!(error = %e, step = %step_number, "Dispatch skipped, view unavailable");
                return;
            }
        };
        let Some(step) = view.step(step_number) else {
            tracing::warn!(step = %step_number, "Dispatch skipped, step not in view");
            return;
        };
        if step.is_gate() {
            return;
        }

        let request = DispatchRequest {
            workflow_id: handle.id().clone(),
            step_number,
            step_name: step.name.clone(),
            agent_role: step.agent_role,
            input,
        };

        tracing::debug!(
            workflow_id = %handle.id(),
            step = %step_number,
            agent = request.agent_role.label(),
            "Running step executor"
        );

        let (sink, mut progress_rx) = ProgressSink::channel();
        let progress_handle = handle.clone();
        let pump = tokio::spawn(async move {
            while let Some(update) = progress_rx.recv().await {
                let cmd = WorkflowCommand::ExecutorProgress {
                    step_number,
                    line1: update.line1,
                    line2: update.line2,
                };
                if progress_handle.execute(cmd).await.is_err() {
                    break;
                }
            }
        });

        let reply = executor.execute(request, sink).await;

        let cmd = match reply {
            ExecutorReply::Output(output) => WorkflowCommand::ExecutorSucceeded {
                step_number,
                output,
                options: Vec::new(),
            },
            ExecutorReply::OutputWithOptions { output, options } => {
                WorkflowCommand::ExecutorSucceeded {
                    step_number,
                    output,
                    options,
                }
            }
            ExecutorReply::Error(error) => WorkflowCommand::ExecutorFailed { step_number, error },
        };

        if let Err(e) = handle.execute(cmd).await {
            tracing::warn!(
                workflow_id = %handle.id(),
                step = %step_number,
                error = %e,
                "Failed to deliver executor result"
            );
        }

        // The sink was moved into the executor; once it returns the channel
        // is closed and the pump drains out on its own. Abort covers
        // executors that stash the sink somewhere long-lived.
        pump.abort();
    });
}

/// Scans the data directory for workflow subdirectories with an event log.
fn persisted_workflow_ids(data_dir: &Path) -> anyhow::Result<Vec<WorkflowId>> {
    let mut ids = Vec::new();
    let entries = match std::fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
        Err(e) => return Err(anyhow::anyhow!("reading {}: {}", data_dir.display(), e)),
    };

    for entry in entries {
        let entry = entry?;
        if !entry.path().join("events.jsonl").is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(name) = name.to_str() {
            if let Ok(id) = WorkflowId::from_string(name) {
                ids.push(id);
            }
        }
    }

    Ok(ids)
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
