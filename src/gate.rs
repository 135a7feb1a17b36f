//! The human review surface.
//!
//! `ReviewGate` is the only mutator human reviewers touch. Both operations
//! validate synchronously inside the aggregate before anything is persisted,
//! so a failed decision is never partially applied, and a double-click race
//! loses cleanly (the second decision finds the step no longer awaiting
//! review).

use crate::domain::errors::WorkflowError;
use crate::domain::types::StepNumber;
use crate::domain::view::WorkflowView;
use crate::domain::WorkflowCommand;
use crate::runtime::WorkflowHandle;

/// Approve/reject surface for one workflow.
pub struct ReviewGate {
    handle: WorkflowHandle,
}

impl ReviewGate {
    pub(crate) fn new(handle: WorkflowHandle) -> Self {
        Self { handle }
    }

    /// Approves the step awaiting review and advances the pipeline.
    ///
    /// `selected_option` is required when the step offers more than one
    /// option; the selected option is what flows downstream.
    pub async fn approve_step(
        &self,
        step_number: StepNumber,
        review_notes: Option<String>,
        selected_option: Option<usize>,
    ) -> Result<WorkflowView, WorkflowError> {
        self.handle
            .execute(WorkflowCommand::ApproveStep {
                step_number,
                review_notes,
                selected_option,
            })
            .await
    }

    /// Rejects the step awaiting review. Notes are mandatory: they become
    /// the rewrite brief for the producing step, which is re-dispatched
    /// immediately.
    pub async fn reject_step(
        &self,
        step_number: StepNumber,
        review_notes: impl Into<String>,
    ) -> Result<WorkflowView, WorkflowError> {
        self.handle
            .execute(WorkflowCommand::RejectStep {
                step_number,
                review_notes: review_notes.into(),
            })
            .await
    }
}
