//! The executor boundary.
//!
//! Step execution is consumed, not provided: callers hand the runtime a
//! `StepExecutor` and the pipeline pushes dispatch requests into it.
//! Payloads cross this boundary exactly once as typed `StepOutput` values;
//! nothing downstream re-parses serialized blobs.

use crate::domain::step::{StepInput, StepOutput};
use crate::domain::types::{AgentRole, StepNumber, WorkflowId};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Everything the executor needs to run one step.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub workflow_id: WorkflowId,
    pub step_number: StepNumber,
    pub step_name: String,
    pub agent_role: AgentRole,
    pub input: StepInput,
}

/// Exactly one reply per dispatch.
#[derive(Debug, Clone)]
pub enum ExecutorReply {
    /// The step produced a single output.
    Output(StepOutput),
    /// The step produced an output and alternatives for the reviewer to
    /// pick from.
    OutputWithOptions {
        output: StepOutput,
        options: Vec<StepOutput>,
    },
    /// The step failed. The message lands on the step record; the workflow
    /// fails with it.
    Error(String),
}

/// A live thinking-line update. Purely informational, never a status change.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub line1: Option<String>,
    pub line2: Option<String>,
}

/// Handed to the executor alongside each dispatch; updates flow back into
/// the event stream as the agent works.
#[derive(Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ProgressSink {
    /// Creates a sink and the receiving half the runtime drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Reports the agent's current thinking lines. Safe to call after the
    /// step has moved on; stale updates are discarded upstream.
    pub fn update(&self, line1: Option<String>, line2: Option<String>) {
        let _ = self.tx.send(ProgressUpdate { line1, line2 });
    }
}

/// Runs agent steps. Implementations live outside this crate; the pipeline
/// only pushes requests and consumes replies.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(&self, request: DispatchRequest, progress: ProgressSink) -> ExecutorReply;
}
