//! Workflow supervisor for fault-tolerant actor management.
//!
//! The supervisor monitors workflow actors and automatically respawns them
//! if they fail or terminate unexpectedly. The event log makes restarts
//! safe: the respawned actor rehydrates from persisted events.

use crate::domain::actor::{WorkflowActor, WorkflowActorArgs, WorkflowMessage};
use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};
use tokio::sync::oneshot;

/// Messages for the workflow supervisor.
pub enum SupervisorMsg {
    /// Spawn a workflow actor and reply with its reference.
    Spawn(
        WorkflowActorArgs,
        oneshot::Sender<ActorRef<WorkflowMessage>>,
    ),
    /// Stop the supervised actor and the supervisor itself. The event log
    /// stays on disk, so the workflow can be resumed later.
    Stop,
}

/// The workflow supervisor actor.
pub struct WorkflowSupervisor;

#[derive(Default)]
pub struct SupervisorState {
    /// Respawn args; cleared on `Stop` so a deliberate shutdown is not
    /// mistaken for a crash.
    args: Option<WorkflowActorArgs>,
    child: Option<ActorRef<WorkflowMessage>>,
}

#[async_trait]
impl Actor for WorkflowSupervisor {
    type Msg = SupervisorMsg;
    type State = SupervisorState;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _args: (),
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(SupervisorState::default())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        msg: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match msg {
            SupervisorMsg::Spawn(args, reply) => {
                state.args = Some(args.clone());
                let (actor_ref, _handle) =
                    WorkflowActor::spawn_linked(None, WorkflowActor, args, myself.get_cell())
                        .await?;
                state.child = Some(actor_ref.clone());
                if reply.send(actor_ref).is_err() {
                    tracing::debug!("Spawn reply channel closed");
                }
            }
            SupervisorMsg::Stop => {
                state.args = None;
                if let Some(child) = state.child.take() {
                    child.stop(None);
                }
                myself.stop(None);
            }
        }
        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        evt: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if matches!(
            evt,
            SupervisionEvent::ActorFailed(_, _) | SupervisionEvent::ActorTerminated(_, _, _)
        ) {
            if let Some(args) = state.args.clone() {
                tracing::warn!(aggregate_id = %args.aggregate_id, "workflow actor down, respawning");
                let (actor_ref, _handle) =
                    WorkflowActor::spawn_linked(None, WorkflowActor, args, myself.get_cell())
                        .await?;
                state.child = Some(actor_ref);
            }
        }
        Ok(())
    }
}
