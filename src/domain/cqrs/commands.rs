//! Workflow commands for the CQRS aggregate.
//!
//! Commands represent intent to change state. The aggregate validates
//! commands and produces events that are persisted to the event log.
//! Executor callbacks and human review decisions arrive through the same
//! command channel, so one workflow sees them strictly serialized.

use crate::domain::step::StepOutput;
use crate::domain::types::{
    AuthorId, ContentType, ResearchId, SelectedAngle, StepNumber,
};
use crate::template::StepTemplate;
use serde::{Deserialize, Serialize};

/// Commands that can be executed against the workflow aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowCommand {
    /// Initialize aggregate state for a new workflow. The template snapshot
    /// is carried in the command so in-flight workflows are immune to later
    /// registry edits.
    CreateWorkflow {
        content_type: ContentType,
        template: Vec<StepTemplate>,
        selected_angle: SelectedAngle,
        source_research_id: ResearchId,
        briefing: Option<String>,
        author_id: Option<AuthorId>,
    },

    /// Executor callback: the step produced output. `options` carries
    /// alternatives when the agent generated several candidates.
    ExecutorSucceeded {
        step_number: StepNumber,
        output: StepOutput,
        options: Vec<StepOutput>,
    },

    /// Executor callback: the step failed.
    ExecutorFailed {
        step_number: StepNumber,
        error: String,
    },

    /// Executor callback: live thinking-line update. Never changes status.
    ExecutorProgress {
        step_number: StepNumber,
        line1: Option<String>,
        line2: Option<String>,
    },

    /// Reviewer approved a step awaiting review. `selected_option` is
    /// required when the step offers more than one option.
    ApproveStep {
        step_number: StepNumber,
        review_notes: Option<String>,
        selected_option: Option<usize>,
    },

    /// Reviewer rejected a step awaiting review. Notes are mandatory; they
    /// become the rewrite brief for the redone step.
    RejectStep {
        step_number: StepNumber,
        review_notes: String,
    },

    /// Re-run a failed step and reactivate the workflow.
    RetryStep { step_number: StepNumber },

    /// Cancel the workflow; non-terminal steps are skipped.
    CancelWorkflow { reason: String },
}

/// Human-readable command name for error messages and logs.
pub(crate) fn command_name(cmd: &WorkflowCommand) -> &'static str {
    match cmd {
        WorkflowCommand::CreateWorkflow { .. } => "CreateWorkflow",
        WorkflowCommand::ExecutorSucceeded { .. } => "ExecutorSucceeded",
        WorkflowCommand::ExecutorFailed { .. } => "ExecutorFailed",
        WorkflowCommand::ExecutorProgress { .. } => "ExecutorProgress",
        WorkflowCommand::ApproveStep { .. } => "ApproveStep",
        WorkflowCommand::RejectStep { .. } => "RejectStep",
        WorkflowCommand::RetryStep { .. } => "RetryStep",
        WorkflowCommand::CancelWorkflow { .. } => "CancelWorkflow",
    }
}
