//! Workflow view projection for observers.
//!
//! The WorkflowView is derived from WorkflowEvent only (no direct mutation).
//! Every observer that folds the same event stream converges on the same
//! view, and the screen each client renders is derived here from the
//! server-confirmed step position.

use crate::domain::cqrs::WorkflowAggregate;
use crate::domain::step::WorkflowStep;
use crate::domain::types::{
    AuthorId, ContentType, ResearchId, SelectedAngle, StepNumber, StepStatus, TimestampUtc,
    WorkflowId, WorkflowStatus,
};
use crate::domain::WorkflowEvent;
use crate::screen::{screen_for, Screen};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-only view of workflow state derived from events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowView {
    workflow_id: Option<WorkflowId>,
    content_type: Option<ContentType>,
    status: WorkflowStatus,
    current_step_number: Option<StepNumber>,
    selected_angle: Option<SelectedAngle>,
    source_research_id: Option<ResearchId>,
    briefing: Option<String>,
    author_id: Option<AuthorId>,
    created_at: Option<TimestampUtc>,
    completed_at: Option<TimestampUtc>,
    cancel_reason: Option<String>,
    steps: Vec<WorkflowStep>,
    last_event_sequence: u64,
}

impl WorkflowView {
    /// Apply an event to update the view.
    pub fn apply_event(&mut self, aggregate_id: &str, event: &WorkflowEvent, sequence: u64) {
        // Parse aggregate_id as UUID - log warning on invalid format
        match Uuid::parse_str(aggregate_id) {
            Ok(uuid) => self.workflow_id = Some(WorkflowId(uuid)),
            Err(e) => tracing::warn!("Invalid aggregate ID '{}': {}", aggregate_id, e),
        }
        self.last_event_sequence = sequence;

        match event {
            WorkflowEvent::WorkflowCreated {
                content_type,
                template,
                selected_angle,
                source_research_id,
                briefing,
                author_id,
                created_at,
            } => {
                self.content_type = Some(*content_type);
                self.status = WorkflowStatus::Pending;
                self.current_step_number = Some(StepNumber::first());
                self.selected_angle = Some(selected_angle.clone());
                self.source_research_id = Some(source_research_id.clone());
                self.briefing = briefing.clone();
                self.author_id = author_id.clone();
                self.created_at = Some(*created_at);
                self.completed_at = None;
                self.cancel_reason = None;
                self.steps = template
                    .iter()
                    .enumerate()
                    .map(|(idx, t)| WorkflowStep::pending(StepNumber(idx as u32 + 1), t))
                    .collect();
            }

            WorkflowEvent::StepDispatched {
                step_number,
                input,
                dispatched_at,
            } => {
                if let Some(step) = self.step_mut(*step_number) {
                    step.apply_dispatch(input.clone(), *dispatched_at);
                }
                for step in &mut self.steps {
                    if step.step_number > *step_number && step.status != StepStatus::Pending {
                        step.apply_reset();
                    }
                }
                self.status = WorkflowStatus::Active;
                self.current_step_number = Some(*step_number);
                self.completed_at = None;
            }

            WorkflowEvent::StepProgressUpdated {
                step_number,
                line1,
                line2,
                ..
            } => {
                if let Some(step) = self.step_mut(*step_number) {
                    step.apply_progress(line1.clone(), line2.clone());
                }
            }

            WorkflowEvent::StepCompleted {
                step_number,
                output,
                completed_at,
            } => {
                if let Some(step) = self.step_mut(*step_number) {
                    step.apply_completed(output.clone(), *completed_at);
                }
            }

            WorkflowEvent::StepAwaitingReview {
                step_number,
                output,
                output_options,
                paused_at,
            } => {
                if let Some(step) = self.step_mut(*step_number) {
                    step.apply_awaiting_review(
                        output.clone(),
                        output_options.clone(),
                        *paused_at,
                    );
                }
                self.status = WorkflowStatus::PausedForReview;
                self.current_step_number = Some(*step_number);
            }

            WorkflowEvent::StepFailed {
                step_number,
                error,
                failed_at,
            } => {
                if let Some(step) = self.step_mut(*step_number) {
                    step.apply_failed(error.clone(), *failed_at);
                }
                self.status = WorkflowStatus::Failed;
            }

            WorkflowEvent::StepApproved {
                step_number,
                selected_option_index,
                review_notes,
                reviewed_at,
            } => {
                if let Some(step) = self.step_mut(*step_number) {
                    step.apply_approved(
                        *selected_option_index,
                        review_notes.clone(),
                        *reviewed_at,
                    );
                }
                self.status = WorkflowStatus::Active;
            }

            WorkflowEvent::StepRejected {
                step_number,
                review_notes,
                reviewed_at,
            } => {
                if let Some(step) = self.step_mut(*step_number) {
                    step.apply_rejected(review_notes.clone(), *reviewed_at);
                }
                self.status = WorkflowStatus::Active;
            }

            WorkflowEvent::WorkflowCompleted { completed_at } => {
                self.status = WorkflowStatus::Completed;
                self.completed_at = Some(*completed_at);
                self.current_step_number = Some(StepNumber(self.steps.len() as u32 + 1));
            }

            WorkflowEvent::WorkflowCancelled { reason, .. } => {
                self.status = WorkflowStatus::Cancelled;
                self.cancel_reason = Some(reason.clone());
                for step in &mut self.steps {
                    if matches!(
                        step.status,
                        StepStatus::Pending | StepStatus::AgentWorking | StepStatus::AwaitingReview
                    ) {
                        step.apply_skipped();
                    }
                }
            }
        }
    }

    fn step_mut(&mut self, number: StepNumber) -> Option<&mut WorkflowStep> {
        self.steps.get_mut(number.index())
    }

    /// Returns the workflow ID.
    pub fn workflow_id(&self) -> Option<&WorkflowId> {
        self.workflow_id.as_ref()
    }

    /// Returns the content type.
    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type
    }

    /// Returns the workflow status.
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Returns the current step position (N+1 exactly when completed).
    pub fn current_step_number(&self) -> Option<StepNumber> {
        self.current_step_number
    }

    /// Returns the selected editorial angle.
    pub fn selected_angle(&self) -> Option<&SelectedAngle> {
        self.selected_angle.as_ref()
    }

    /// Returns the source research identifier.
    pub fn source_research_id(&self) -> Option<&ResearchId> {
        self.source_research_id.as_ref()
    }

    /// Returns the briefing text, when one was provided.
    pub fn briefing(&self) -> Option<&String> {
        self.briefing.as_ref()
    }

    /// Returns the attributed author.
    pub fn author_id(&self) -> Option<&AuthorId> {
        self.author_id.as_ref()
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> Option<TimestampUtc> {
        self.created_at
    }

    /// Returns the completion timestamp.
    pub fn completed_at(&self) -> Option<TimestampUtc> {
        self.completed_at
    }

    /// Returns the cancellation reason.
    pub fn cancel_reason(&self) -> Option<&String> {
        self.cancel_reason.as_ref()
    }

    /// Returns all steps, ordered by step number.
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// Looks up a step by its 1-based number.
    pub fn step(&self, number: StepNumber) -> Option<&WorkflowStep> {
        self.steps.get(number.index())
    }

    /// Returns the step currently in flight, when one is.
    pub fn active_step(&self) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.status.is_in_flight())
    }

    /// Returns the last event sequence number.
    pub fn last_event_sequence(&self) -> u64 {
        self.last_event_sequence
    }

    /// True once the workflow reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The screen a client should render for the current position. `None`
    /// until the workflow exists.
    pub fn screen(&self) -> Option<Screen> {
        self.current_step_number.map(screen_for)
    }
}

/// Serializable wrapper for event envelopes used in broadcasting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEventEnvelope {
    pub aggregate_id: String,
    pub sequence: u64,
    pub event: WorkflowEvent,
}

impl From<&cqrs_es::EventEnvelope<WorkflowAggregate>> for WorkflowEventEnvelope {
    fn from(source: &cqrs_es::EventEnvelope<WorkflowAggregate>) -> Self {
        Self {
            aggregate_id: source.aggregate_id.clone(),
            sequence: source.sequence as u64,
            event: source.payload.clone(),
        }
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
