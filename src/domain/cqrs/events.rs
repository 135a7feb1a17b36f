//! Workflow events for the CQRS aggregate.
//!
//! Events represent facts that have happened. They are the single source of
//! truth for the workflow state and are persisted to the event log. Workflows
//! and steps are never deleted; the log is the durable audit trail.

use crate::domain::step::{StepInput, StepOutput};
use crate::domain::types::{
    AuthorId, ContentType, ResearchId, SelectedAngle, StepNumber, TimestampUtc,
};
use crate::template::StepTemplate;
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

/// Events emitted by the workflow aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Workflow was created; all steps materialize in pending.
    WorkflowCreated {
        content_type: ContentType,
        template: Vec<StepTemplate>,
        selected_angle: SelectedAngle,
        source_research_id: ResearchId,
        briefing: Option<String>,
        author_id: Option<AuthorId>,
        created_at: TimestampUtc,
    },

    /// A step was handed to the executor. Also emitted for redos after
    /// rejection and retries after failure; any steps past the dispatched
    /// one return to pending.
    StepDispatched {
        step_number: StepNumber,
        input: StepInput,
        dispatched_at: TimestampUtc,
    },

    /// Live thinking-line update from the executor.
    StepProgressUpdated {
        step_number: StepNumber,
        line1: Option<String>,
        line2: Option<String>,
        updated_at: TimestampUtc,
    },

    /// Step finished without needing review.
    StepCompleted {
        step_number: StepNumber,
        output: StepOutput,
        completed_at: TimestampUtc,
    },

    /// Step paused for human review. For pure gates `output` carries the
    /// nearest producing predecessor's content so the reviewer always sees
    /// what is under review.
    StepAwaitingReview {
        step_number: StepNumber,
        output: Option<StepOutput>,
        output_options: Vec<StepOutput>,
        paused_at: TimestampUtc,
    },

    /// Step failed; the workflow fails with it. No automatic retry.
    StepFailed {
        step_number: StepNumber,
        error: String,
        failed_at: TimestampUtc,
    },

    /// Reviewer approved the step.
    StepApproved {
        step_number: StepNumber,
        selected_option_index: Option<usize>,
        review_notes: Option<String>,
        reviewed_at: TimestampUtc,
    },

    /// Reviewer rejected the step. A StepDispatched for the producing step
    /// follows in the same batch.
    StepRejected {
        step_number: StepNumber,
        review_notes: String,
        reviewed_at: TimestampUtc,
    },

    /// Every step is done; current position moves past the last step.
    WorkflowCompleted { completed_at: TimestampUtc },

    /// Workflow was cancelled; non-terminal steps are skipped.
    WorkflowCancelled {
        reason: String,
        cancelled_at: TimestampUtc,
    },
}

impl DomainEvent for WorkflowEvent {
    fn event_type(&self) -> String {
        match self {
            Self::WorkflowCreated { .. } => "WorkflowCreated".to_string(),
            Self::StepDispatched { .. } => "StepDispatched".to_string(),
            Self::StepProgressUpdated { .. } => "StepProgressUpdated".to_string(),
            Self::StepCompleted { .. } => "StepCompleted".to_string(),
            Self::StepAwaitingReview { .. } => "StepAwaitingReview".to_string(),
            Self::StepFailed { .. } => "StepFailed".to_string(),
            Self::StepApproved { .. } => "StepApproved".to_string(),
            Self::StepRejected { .. } => "StepRejected".to_string(),
            Self::WorkflowCompleted { .. } => "WorkflowCompleted".to_string(),
            Self::WorkflowCancelled { .. } => "WorkflowCancelled".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1".to_string()
    }
}
